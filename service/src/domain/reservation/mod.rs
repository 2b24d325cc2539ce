//! [`Reservation`] definitions.

pub mod pricing;

use std::fmt;

use common::{define_kind, marker, Date, DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{payment, unit, user, Unit};

pub use self::pricing::{Price, PricingError};

/// Guest's claim on a [`Unit`] for a [`Stay`].
#[derive(Clone, Debug)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: Id,

    /// ID of the reserved [`Unit`].
    pub unit_id: unit::Id,

    /// ID of the user staying in the [`Unit`].
    pub guest_id: user::Id,

    /// ID of the user hosting the [`Unit`].
    pub host_id: user::Id,

    /// Reserved [`Stay`].
    pub stay: Stay,

    /// Number of guests.
    pub guest_count: GuestCount,

    /// [`Price`] snapshot taken at creation.
    pub price: Price,

    /// [`BookingStatus`] of this [`Reservation`].
    pub booking_status: BookingStatus,

    /// [`PaymentStatus`] of this [`Reservation`].
    pub payment_status: PaymentStatus,

    /// ID of the payment intent paying for this [`Reservation`], if any.
    pub payment_intent_id: Option<payment::intent::Id>,

    /// Amount refunded to the guest so far.
    pub refunded_amount: Money,

    /// [`Cancellation`] details, if this [`Reservation`] is cancelled.
    pub cancellation: Option<Cancellation>,

    /// [`DateTime`] when this [`Reservation`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Reservation`] was modified last time.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`Reservation`] was confirmed, if it was.
    pub confirmed_at: Option<ConfirmationDateTime>,

    /// [`DateTime`] when this [`Reservation`] was completed, if it was.
    pub completed_at: Option<CompletionDateTime>,
}

impl Reservation {
    /// Creates a new [`BookingStatus::Pending`] [`Reservation`] of the
    /// provided [`Unit`].
    #[must_use]
    pub fn new(
        unit: &Unit,
        guest_id: user::Id,
        stay: Stay,
        guest_count: GuestCount,
        price: Price,
        now: DateTime,
    ) -> Self {
        Self {
            id: Id::new(),
            unit_id: unit.id,
            guest_id,
            host_id: unit.host_id,
            stay,
            guest_count,
            price,
            booking_status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_intent_id: None,
            refunded_amount: Money::ZERO,
            cancellation: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            confirmed_at: None,
            completed_at: None,
        }
    }

    /// Indicates whether the provided user is the guest or the host of this
    /// [`Reservation`].
    #[must_use]
    pub fn is_party(&self, user_id: user::Id) -> bool {
        self.guest_id == user_id || self.host_id == user_id
    }

    /// Accepts this [`Reservation`] on behalf of its host.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is not [`BookingStatus::Pending`].
    pub fn accept(&mut self, now: DateTime) -> Result<(), TransitionError> {
        if self.booking_status != BookingStatus::Pending {
            return Err(self.cannot(Action::Accept));
        }
        self.booking_status = BookingStatus::Confirmed;
        self.confirmed_at = Some(now.coerce());
        self.updated_at = now.coerce();
        Ok(())
    }

    /// Declines this [`Reservation`] on behalf of its host.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is not [`BookingStatus::Pending`].
    pub fn decline(
        &mut self,
        host_id: user::Id,
        reason: CancellationReason,
        now: DateTime,
    ) -> Result<(), TransitionError> {
        if self.booking_status != BookingStatus::Pending {
            return Err(self.cannot(Action::Decline));
        }
        self.mark_cancelled(Some(host_id), reason, now);
        Ok(())
    }

    /// Cancels this [`Reservation`] on behalf of one of its parties.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is neither [`BookingStatus::Pending`] nor
    /// [`BookingStatus::Confirmed`].
    pub fn cancel(
        &mut self,
        by: user::Id,
        reason: CancellationReason,
        now: DateTime,
    ) -> Result<(), TransitionError> {
        if !self.booking_status.is_blocking() {
            return Err(self.cannot(Action::Cancel));
        }
        self.mark_cancelled(Some(by), reason, now);
        Ok(())
    }

    /// Completes this [`Reservation`] if its [`Stay`] has ended by the
    /// provided `today`.
    ///
    /// Returns `false` if this [`Reservation`] is completed already.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is not [`BookingStatus::Confirmed`], or its
    /// [`Stay`] hasn't ended yet.
    pub fn complete(
        &mut self,
        today: Date,
        now: DateTime,
    ) -> Result<bool, TransitionError> {
        match self.booking_status {
            BookingStatus::Completed => Ok(false),
            BookingStatus::Confirmed if self.stay.check_out() <= today => {
                self.booking_status = BookingStatus::Completed;
                self.completed_at = Some(now.coerce());
                self.updated_at = now.coerce();
                Ok(true)
            }
            BookingStatus::Pending
            | BookingStatus::Confirmed
            | BookingStatus::Cancelled => Err(self.cannot(Action::Complete)),
        }
    }

    /// Records a succeeded payment, confirming a [`BookingStatus::Pending`]
    /// [`Reservation`] along the way.
    ///
    /// Returns `false` if the payment is recorded already, so duplicated
    /// deliveries change nothing.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is cancelled or its payment was refunded.
    pub fn settle_payment(
        &mut self,
        now: DateTime,
    ) -> Result<bool, TransitionError> {
        match (self.booking_status, self.payment_status) {
            (_, PaymentStatus::Completed) => Ok(false),
            (
                BookingStatus::Cancelled,
                PaymentStatus::Pending
                | PaymentStatus::Partial
                | PaymentStatus::Refunded,
            )
            | (
                BookingStatus::Pending
                | BookingStatus::Confirmed
                | BookingStatus::Completed,
                PaymentStatus::Partial | PaymentStatus::Refunded,
            ) => Err(self.cannot(Action::Pay)),
            (
                BookingStatus::Pending
                | BookingStatus::Confirmed
                | BookingStatus::Completed,
                PaymentStatus::Pending,
            ) => {
                self.payment_status = PaymentStatus::Completed;
                if self.booking_status == BookingStatus::Pending {
                    self.booking_status = BookingStatus::Confirmed;
                    self.confirmed_at = Some(now.coerce());
                }
                self.updated_at = now.coerce();
                Ok(true)
            }
        }
    }

    /// Records a failed payment attempt.
    ///
    /// A failure never overrides a recorded payment or refund, so `false` is
    /// returned for a stale failure.
    pub fn fail_payment(&mut self, now: DateTime) -> bool {
        if self.payment_status != PaymentStatus::Pending {
            return false;
        }
        self.updated_at = now.coerce();
        true
    }

    /// Records the provided cumulative `refunded` amount out of the
    /// `charged` one, cancelling a not yet completed [`Reservation`].
    ///
    /// Returns `false` if the `refunded` amount is recorded already.
    pub fn refund(
        &mut self,
        refunded: Money,
        charged: Money,
        by: Option<user::Id>,
        reason: CancellationReason,
        now: DateTime,
    ) -> bool {
        if refunded <= self.refunded_amount {
            return false;
        }
        self.refunded_amount = refunded;
        self.payment_status = if refunded >= charged {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::Partial
        };
        if self.booking_status.is_blocking() {
            self.mark_cancelled(by, reason, now);
        }
        self.updated_at = now.coerce();
        true
    }

    /// Moves this [`Reservation`] to [`BookingStatus::Cancelled`].
    fn mark_cancelled(
        &mut self,
        by: Option<user::Id>,
        reason: CancellationReason,
        now: DateTime,
    ) {
        self.booking_status = BookingStatus::Cancelled;
        self.cancellation = Some(Cancellation {
            reason,
            cancelled_by: by,
            cancelled_at: now.coerce(),
        });
        self.updated_at = now.coerce();
    }

    /// Builds a [`TransitionError`] of the provided [`Action`].
    fn cannot(&self, action: Action) -> TransitionError {
        TransitionError {
            action,
            booking_status: self.booking_status,
            payment_status: self.payment_status,
        }
    }
}

/// ID of a [`Reservation`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Half-open `[check_in, check_out)` range of nights.
///
/// The guest leaves on `check_out`, so the next guest may arrive that day.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Stay {
    /// Arrival [`Date`].
    check_in: Date,

    /// Departure [`Date`].
    check_out: Date,
}

impl Stay {
    /// Creates a new [`Stay`] if `check_out` is after `check_in`.
    #[must_use]
    pub fn new(check_in: Date, check_out: Date) -> Option<Self> {
        (check_out > check_in).then_some(Self {
            check_in,
            check_out,
        })
    }

    /// Returns the arrival [`Date`] of this [`Stay`].
    #[must_use]
    pub fn check_in(&self) -> Date {
        self.check_in
    }

    /// Returns the departure [`Date`] of this [`Stay`].
    #[must_use]
    pub fn check_out(&self) -> Date {
        self.check_out
    }

    /// Returns the number of nights in this [`Stay`].
    #[must_use]
    pub fn nights(&self) -> u32 {
        u32::try_from(self.check_in.days_until(self.check_out))
            .unwrap_or(u32::MAX)
    }

    /// Indicates whether this [`Stay`] shares at least one night with the
    /// `other` one.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        !(other.check_out <= self.check_in || other.check_in >= self.check_out)
    }
}

impl fmt::Display for Stay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}

/// Number of guests staying.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd)]
pub struct GuestCount(u16);

impl GuestCount {
    /// Creates a new [`GuestCount`] if there is at least one guest.
    #[must_use]
    pub fn new(count: u16) -> Option<Self> {
        (count > 0).then_some(Self(count))
    }
}

/// Details of a [`Reservation`] cancellation.
#[derive(Clone, Debug)]
pub struct Cancellation {
    /// [`CancellationReason`] stated.
    pub reason: CancellationReason,

    /// ID of the user who cancelled, if the cancellation wasn't caused by
    /// the payment provider.
    pub cancelled_by: Option<user::Id>,

    /// [`DateTime`] of the cancellation.
    pub cancelled_at: CancellationDateTime,
}

/// Reason of a [`Reservation`] cancellation.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct CancellationReason(String);

impl CancellationReason {
    /// Maximum length of a [`CancellationReason`], in characters.
    pub const MAX_LEN: usize = 512;

    /// Creates a new [`CancellationReason`] out of the provided text, trimming
    /// it.
    ///
    /// [`None`] is returned if the trimmed text is empty or too long.
    #[must_use]
    pub fn new(reason: impl AsRef<str>) -> Option<Self> {
        let reason = reason.as_ref().trim();
        (!reason.is_empty() && reason.chars().count() <= Self::MAX_LEN)
            .then(|| Self(reason.to_owned()))
    }

    /// Returns the [`CancellationReason`] of a refund stating no reason.
    #[must_use]
    pub fn refunded() -> Self {
        Self("Payment refunded".to_owned())
    }
}

define_kind! {
    #[doc = "Status of a [`Reservation`] booking."]
    enum BookingStatus {
        #[doc = "Awaiting the host decision."]
        Pending = 1,

        #[doc = "Accepted by the host or paid."]
        Confirmed = 2,

        #[doc = "Declined, cancelled or refunded."]
        Cancelled = 3,

        #[doc = "Stay has ended."]
        Completed = 4,
    }
}

impl BookingStatus {
    /// Indicates whether a [`Reservation`] in this [`BookingStatus`] holds
    /// its [`Stay`] nights.
    #[must_use]
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

define_kind! {
    #[doc = "Status of a [`Reservation`] payment."]
    enum PaymentStatus {
        #[doc = "Not paid yet."]
        Pending = 1,

        #[doc = "Paid and refunded partially."]
        Partial = 2,

        #[doc = "Paid."]
        Completed = 3,

        #[doc = "Paid and refunded fully."]
        Refunded = 4,
    }
}

/// Lifecycle action applied to a [`Reservation`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Action {
    /// [`Reservation::accept()`].
    #[display("accepted")]
    Accept,

    /// [`Reservation::decline()`].
    #[display("declined")]
    Decline,

    /// [`Reservation::cancel()`].
    #[display("cancelled")]
    Cancel,

    /// [`Reservation::complete()`].
    #[display("completed")]
    Complete,

    /// [`Reservation::settle_payment()`].
    #[display("paid")]
    Pay,
}

/// Error of applying an [`Action`] not allowed in the current state of a
/// [`Reservation`].
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[display(
    "`{booking_status}` reservation with `{payment_status}` payment cannot be \
     {action}"
)]
pub struct TransitionError {
    /// Rejected [`Action`].
    pub action: Action,

    /// [`BookingStatus`] at the moment of the rejection.
    pub booking_status: BookingStatus,

    /// [`PaymentStatus`] at the moment of the rejection.
    pub payment_status: PaymentStatus,
}

/// [`DateTime`] when a [`Reservation`] was created.
pub type CreationDateTime = DateTimeOf<(Reservation, marker::Creation)>;

/// [`DateTime`] when a [`Reservation`] was modified.
pub type ModificationDateTime = DateTimeOf<(Reservation, marker::Modification)>;

/// [`DateTime`] when a [`Reservation`] was confirmed.
pub type ConfirmationDateTime = DateTimeOf<(Reservation, marker::Confirmation)>;

/// [`DateTime`] when a [`Reservation`] was cancelled.
pub type CancellationDateTime = DateTimeOf<(Reservation, marker::Cancellation)>;

/// [`DateTime`] when a [`Reservation`] was completed.
pub type CompletionDateTime = DateTimeOf<(Reservation, marker::Completion)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::{Date, DateTime, Money};

    use crate::domain::{unit, user, Unit};

    use super::{
        Action, BookingStatus, CancellationReason, GuestCount, PaymentStatus,
        Price, Reservation, Stay,
    };

    pub(crate) fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    pub(crate) fn stay(check_in: &str, check_out: &str) -> Stay {
        Stay::new(date(check_in), date(check_out)).unwrap()
    }

    fn reservation() -> Reservation {
        let unit = Unit {
            id: unit::Id::new(),
            host_id: user::Id::new(),
            monthly_price: Money::from_minor(180_000),
            cleaning_fee: Money::from_minor(7_500),
            security_deposit: Some(Money::from_minor(180_000)),
            min_stay_weeks: 1,
            max_stay_months: 6,
            max_guests: 2,
            status: unit::Status::Active,
        };
        let price = Price {
            daily_rate: Money::from_minor(6_000),
            subtotal: Money::from_minor(720_000),
            service_fee: Money::from_minor(57_600),
            cleaning_fee: Money::from_minor(7_500),
            security_deposit: Money::from_minor(180_000),
            total: Money::from_minor(965_100),
        };
        Reservation::new(
            &unit,
            user::Id::new(),
            stay("2025-01-15", "2025-05-15"),
            GuestCount::new(2).unwrap(),
            price,
            DateTime::now(),
        )
    }

    fn reason() -> CancellationReason {
        CancellationReason::new("plans changed").unwrap()
    }

    #[test]
    fn stays_overlap_half_open() {
        let base = stay("2025-01-15", "2025-05-15");

        assert!(base.overlaps(&stay("2025-03-01", "2025-04-01")));
        assert!(base.overlaps(&stay("2025-01-01", "2025-01-16")));
        assert!(base.overlaps(&stay("2025-05-14", "2025-06-01")));
        assert!(base.overlaps(&stay("2025-01-01", "2025-06-01")));

        assert!(!base.overlaps(&stay("2025-05-15", "2025-06-01")));
        assert!(!base.overlaps(&stay("2025-01-01", "2025-01-15")));
    }

    #[test]
    fn counts_nights() {
        assert_eq!(stay("2025-01-15", "2025-05-15").nights(), 120);
        assert!(Stay::new(date("2025-01-15"), date("2025-01-15")).is_none());
        assert!(Stay::new(date("2025-01-15"), date("2025-01-14")).is_none());
    }

    #[test]
    fn validates_cancellation_reason() {
        assert_eq!(
            CancellationReason::new("  sick  ").unwrap().as_ref(),
            "sick",
        );
        assert!(CancellationReason::new("   ").is_none());
        assert!(CancellationReason::new("x".repeat(513)).is_none());
        assert!(CancellationReason::new("x".repeat(512)).is_some());
    }

    #[test]
    fn accepts_only_pending() {
        let mut r = reservation();

        r.accept(DateTime::now()).unwrap();
        assert_eq!(r.booking_status, BookingStatus::Confirmed);
        assert!(r.confirmed_at.is_some());

        let err = r.accept(DateTime::now()).unwrap_err();
        assert_eq!(err.action, Action::Accept);
        assert_eq!(err.booking_status, BookingStatus::Confirmed);
    }

    #[test]
    fn cancels_only_blocking() {
        let mut declined = reservation();
        declined
            .decline(declined.host_id, reason(), DateTime::now())
            .unwrap();
        assert_eq!(declined.booking_status, BookingStatus::Cancelled);
        assert!(declined.cancel(declined.guest_id, reason(), DateTime::now())
            .is_err());

        let mut confirmed = reservation();
        confirmed.accept(DateTime::now()).unwrap();
        assert!(confirmed
            .decline(confirmed.host_id, reason(), DateTime::now())
            .is_err());
        confirmed
            .cancel(confirmed.guest_id, reason(), DateTime::now())
            .unwrap();
        let cancellation = confirmed.cancellation.unwrap();
        assert_eq!(cancellation.cancelled_by, Some(confirmed.guest_id));
        assert_eq!(cancellation.reason, reason());
    }

    #[test]
    fn completes_after_check_out_only() {
        let mut r = reservation();
        assert!(r.complete(date("2025-06-01"), DateTime::now()).is_err());

        r.accept(DateTime::now()).unwrap();
        assert!(r.complete(date("2025-05-14"), DateTime::now()).is_err());
        assert_eq!(r.complete(date("2025-05-15"), DateTime::now()), Ok(true));
        assert_eq!(r.booking_status, BookingStatus::Completed);
        assert_eq!(r.complete(date("2025-05-16"), DateTime::now()), Ok(false));

        assert!(r.cancel(r.guest_id, reason(), DateTime::now()).is_err());
    }

    #[test]
    fn settles_payment_idempotently() {
        let mut r = reservation();

        assert_eq!(r.settle_payment(DateTime::now()), Ok(true));
        assert_eq!(r.payment_status, PaymentStatus::Completed);
        assert_eq!(r.booking_status, BookingStatus::Confirmed);
        let confirmed_at = r.confirmed_at;

        assert_eq!(r.settle_payment(DateTime::now()), Ok(false));
        assert_eq!(r.confirmed_at, confirmed_at);
    }

    #[test]
    fn never_settles_cancelled() {
        let mut r = reservation();
        r.cancel(r.guest_id, reason(), DateTime::now()).unwrap();

        assert!(r.settle_payment(DateTime::now()).is_err());
        assert_eq!(r.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn ignores_stale_failure() {
        let mut r = reservation();
        assert!(r.fail_payment(DateTime::now()));

        _ = r.settle_payment(DateTime::now()).unwrap();
        assert!(!r.fail_payment(DateTime::now()));
        assert_eq!(r.payment_status, PaymentStatus::Completed);
    }

    #[test]
    fn refunds_partially_then_fully() {
        let mut r = reservation();
        _ = r.settle_payment(DateTime::now()).unwrap();
        let total = r.price.total;

        assert!(r.refund(
            Money::from_minor(100_000),
            total,
            None,
            reason(),
            DateTime::now(),
        ));
        assert_eq!(r.payment_status, PaymentStatus::Partial);
        assert_eq!(r.booking_status, BookingStatus::Cancelled);

        assert!(!r.refund(
            Money::from_minor(100_000),
            total,
            None,
            reason(),
            DateTime::now(),
        ));

        assert!(r.refund(total, total, None, reason(), DateTime::now()));
        assert_eq!(r.payment_status, PaymentStatus::Refunded);
        assert_eq!(r.refunded_amount, total);
    }

    #[test]
    fn keeps_completed_on_refund() {
        let mut r = reservation();
        _ = r.settle_payment(DateTime::now()).unwrap();
        _ = r.complete(date("2025-06-01"), DateTime::now()).unwrap();

        assert!(r.refund(
            r.price.total,
            r.price.total,
            None,
            reason(),
            DateTime::now(),
        ));
        assert_eq!(r.booking_status, BookingStatus::Completed);
        assert_eq!(r.payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn serializes_statuses_by_name() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::Confirmed).unwrap(),
            r#""CONFIRMED""#,
        );
        assert_eq!(
            serde_json::from_str::<PaymentStatus>(r#""PARTIAL""#).unwrap(),
            PaymentStatus::Partial,
        );
    }
}
