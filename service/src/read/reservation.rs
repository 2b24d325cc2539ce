//! [`Reservation`]-related read definitions.

use common::{Date, Money};
use derive_more::{Deref, Display};

use crate::domain::{
    payment,
    reservation::{self, BookingStatus, PaymentStatus, Stay},
    unit, user, Reservation,
};

/// Indicator whether a [`Stay`] of a unit is free of blocking
/// [`Reservation`]s.
#[derive(Clone, Copy, Debug, Deref, Eq, Hash, PartialEq)]
pub struct IsAvailable(pub bool);

impl PartialEq<bool> for IsAvailable {
    fn eq(&self, other: &bool) -> bool {
        self.0 == *other
    }
}

/// IDs of [`BookingStatus::Confirmed`] [`Reservation`]s whose [`Stay`] has
/// ended by some [`Date`].
#[derive(Clone, Debug, Default, Deref, Eq, PartialEq)]
pub struct DueForCompletion(pub Vec<reservation::Id>);

/// Invoice of a [`Reservation`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invoice {
    /// Human-readable number of this [`Invoice`].
    pub number: InvoiceNumber,

    /// ID of the invoiced [`Reservation`].
    pub reservation_id: reservation::Id,

    /// ID of the reserved unit.
    pub unit_id: unit::Id,

    /// ID of the guest.
    pub guest_id: user::Id,

    /// ID of the host.
    pub host_id: user::Id,

    /// Invoiced [`Stay`].
    pub stay: Stay,

    /// Number of nights in the [`Stay`].
    pub nights: u32,

    /// Price of a single night.
    pub daily_rate: Money,

    /// [`LineItem`]s summing up to the `total`.
    pub line_items: Vec<LineItem>,

    /// Total amount.
    pub total: Money,

    /// [`PaymentStatus`] of the [`Reservation`].
    pub payment_status: PaymentStatus,

    /// [`Date`] this [`Invoice`] is issued on.
    pub issued_on: Date,
}

impl Invoice {
    /// Builds the [`Invoice`] of the provided [`Reservation`].
    #[must_use]
    pub fn new(reservation: &Reservation) -> Self {
        let price = &reservation.price;
        let issued_on = reservation.created_at.date();
        Self {
            number: InvoiceNumber::new(reservation.id, issued_on),
            reservation_id: reservation.id,
            unit_id: reservation.unit_id,
            guest_id: reservation.guest_id,
            host_id: reservation.host_id,
            stay: reservation.stay,
            nights: reservation.stay.nights(),
            daily_rate: price.daily_rate,
            line_items: vec![
                LineItem {
                    kind: LineItemKind::Subtotal,
                    amount: price.subtotal,
                },
                LineItem {
                    kind: LineItemKind::ServiceFee,
                    amount: price.service_fee,
                },
                LineItem {
                    kind: LineItemKind::CleaningFee,
                    amount: price.cleaning_fee,
                },
                LineItem {
                    kind: LineItemKind::SecurityDeposit,
                    amount: price.security_deposit,
                },
            ],
            total: price.total,
            payment_status: reservation.payment_status,
            issued_on,
        }
    }
}

/// Number of an [`Invoice`] in `INV-{YYYYMMDD}-{ID prefix}` format.
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Creates a new [`InvoiceNumber`] of the provided [`Reservation`].
    fn new(id: reservation::Id, issued_on: Date) -> Self {
        let date = issued_on.to_string().replace('-', "");
        let id = id.to_string();
        let prefix = id.get(..8).unwrap_or(&id).to_uppercase();
        Self(format!("INV-{date}-{prefix}"))
    }
}

/// Single line of an [`Invoice`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineItem {
    /// [`LineItemKind`] of this [`LineItem`].
    pub kind: LineItemKind,

    /// Amount of this [`LineItem`].
    pub amount: Money,
}

/// Kind of a [`LineItem`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum LineItemKind {
    /// Price of the nights.
    #[display("Subtotal")]
    Subtotal,

    /// Platform service fee.
    #[display("Service fee")]
    ServiceFee,

    /// Cleaning fee.
    #[display("Cleaning fee")]
    CleaningFee,

    /// Refundable security deposit.
    #[display("Security deposit")]
    SecurityDeposit,
}

/// Payment state of a [`Reservation`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaymentDetails {
    /// ID of the [`Reservation`].
    pub reservation_id: reservation::Id,

    /// Amount to be paid.
    pub amount: Money,

    /// Amount refunded so far.
    pub refunded_amount: Money,

    /// [`PaymentStatus`] of the [`Reservation`].
    pub payment_status: PaymentStatus,

    /// [`BookingStatus`] of the [`Reservation`].
    pub booking_status: BookingStatus,

    /// ID of the payment [`payment::Intent`], if any.
    pub intent_id: Option<payment::intent::Id>,
}

impl From<&Reservation> for PaymentDetails {
    fn from(reservation: &Reservation) -> Self {
        Self {
            reservation_id: reservation.id,
            amount: reservation.price.total,
            refunded_amount: reservation.refunded_amount,
            payment_status: reservation.payment_status,
            booking_status: reservation.booking_status,
            intent_id: reservation.payment_intent_id.clone(),
        }
    }
}

pub mod list {
    //! [`Reservation`] list definitions.

    use common::{define_pagination, Date};

    use crate::domain::{
        reservation::BookingStatus, unit, user, Reservation,
    };

    define_pagination!(Reservation, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// ID of the user listing the [`Reservation`]s.
        pub actor_id: user::Id,

        /// [`Role`] of the user in the listed [`Reservation`]s.
        pub role: Role,

        /// [`BookingStatus`] to filter by, if any.
        pub booking_status: Option<BookingStatus>,

        /// ID of the unit to filter by, if any.
        pub unit_id: Option<unit::Id>,

        /// Only [`Reservation`]s not checked out before this [`Date`] are
        /// listed, if provided.
        pub upcoming_from: Option<Date>,
    }

    impl Filter {
        /// Indicates whether the provided [`Reservation`] passes this
        /// [`Filter`].
        #[must_use]
        pub fn matches(&self, reservation: &Reservation) -> bool {
            let party = match self.role {
                Role::Guest => reservation.guest_id == self.actor_id,
                Role::Host => reservation.host_id == self.actor_id,
                Role::Any => reservation.is_party(self.actor_id),
            };
            party
                && self
                    .booking_status
                    .map_or(true, |s| reservation.booking_status == s)
                && self.unit_id.map_or(true, |id| reservation.unit_id == id)
                && self
                    .upcoming_from
                    .map_or(true, |d| reservation.stay.check_out() >= d)
        }
    }

    /// Role of a user in a [`Reservation`].
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub enum Role {
        /// Staying guest.
        Guest,

        /// Hosting user.
        Host,

        /// Either of the two.
        #[default]
        Any,
    }
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use crate::domain::{
        reservation::{spec::stay, GuestCount, Price},
        unit, user, Reservation, Unit,
    };

    use super::{Invoice, LineItemKind};

    #[test]
    fn builds_invoice() {
        let unit = Unit {
            id: unit::Id::new(),
            host_id: user::Id::new(),
            monthly_price: Money::from_minor(180_000),
            cleaning_fee: Money::from_minor(7_500),
            security_deposit: None,
            min_stay_weeks: 0,
            max_stay_months: 12,
            max_guests: 1,
            status: unit::Status::Active,
        };
        let price = Price {
            daily_rate: Money::from_minor(6_000),
            subtotal: Money::from_minor(60_000),
            service_fee: Money::from_minor(4_800),
            cleaning_fee: Money::from_minor(7_500),
            security_deposit: Money::ZERO,
            total: Money::from_minor(72_300),
        };
        let now = DateTime::from_rfc3339("2025-01-02T10:00:00Z").unwrap();
        let reservation = Reservation::new(
            &unit,
            user::Id::new(),
            stay("2025-02-01", "2025-02-11"),
            GuestCount::new(1).unwrap(),
            price,
            now,
        );

        let invoice = Invoice::new(&reservation);

        let number = invoice.number.to_string();
        assert!(number.starts_with("INV-20250102-"), "{number}");
        assert_eq!(number.len(), "INV-20250102-".len() + 8);
        assert_eq!(invoice.nights, 10);
        assert_eq!(invoice.issued_on.to_string(), "2025-01-02");
        assert_eq!(
            invoice.line_items.iter().map(|i| i.kind).collect::<Vec<_>>(),
            [
                LineItemKind::Subtotal,
                LineItemKind::ServiceFee,
                LineItemKind::CleaningFee,
                LineItemKind::SecurityDeposit,
            ],
        );
        assert_eq!(
            invoice.line_items.iter().map(|i| i.amount).sum::<Money>(),
            invoice.total,
        );
    }
}
