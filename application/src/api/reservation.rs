//! [`Reservation`]-related definitions.

use common::{Date, DateTime, Money};
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, read};
use uuid::Uuid;

use crate::{
    api::{payment, UnitId, UserId},
    Context,
};

/// A reservation of a unit.
#[derive(Clone, Debug, From)]
pub struct Reservation(domain::Reservation);

/// Guest's claim on a unit for a stay.
#[graphql_object(context = Context)]
impl Reservation {
    /// Unique identifier of this `Reservation`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the reserved unit.
    #[must_use]
    pub fn unit_id(&self) -> UnitId {
        self.0.unit_id.into()
    }

    /// ID of the staying guest.
    #[must_use]
    pub fn guest_id(&self) -> UserId {
        self.0.guest_id.into()
    }

    /// ID of the hosting user.
    #[must_use]
    pub fn host_id(&self) -> UserId {
        self.0.host_id.into()
    }

    /// Arrival `Date`.
    #[must_use]
    pub fn check_in(&self) -> Date {
        self.0.stay.check_in()
    }

    /// Departure `Date`, exclusive.
    #[must_use]
    pub fn check_out(&self) -> Date {
        self.0.stay.check_out()
    }

    /// Number of nights in the stay.
    #[must_use]
    pub fn nights(&self) -> i32 {
        i32::try_from(self.0.stay.nights()).unwrap_or(i32::MAX)
    }

    /// Number of guests.
    #[must_use]
    pub fn guest_count(&self) -> i32 {
        i32::from(u16::from(self.0.guest_count))
    }

    /// `Price` snapshot taken at creation.
    #[must_use]
    pub fn price(&self) -> Price {
        self.0.price.into()
    }

    /// `BookingStatus` of this `Reservation`.
    #[must_use]
    pub fn booking_status(&self) -> BookingStatus {
        self.0.booking_status.into()
    }

    /// `PaymentStatus` of this `Reservation`.
    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        self.0.payment_status.into()
    }

    /// Amount refunded to the guest so far.
    #[must_use]
    pub fn refunded_amount(&self) -> Money {
        self.0.refunded_amount
    }

    /// ID of the payment intent paying for this `Reservation`, if any.
    #[must_use]
    pub fn payment_intent_id(&self) -> Option<payment::IntentId> {
        self.0.payment_intent_id.clone().map(Into::into)
    }

    /// `Cancellation` details, if this `Reservation` is cancelled.
    #[must_use]
    pub fn cancellation(&self) -> Option<Cancellation> {
        self.0.cancellation.clone().map(Into::into)
    }

    /// `DateTime` when this `Reservation` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Reservation` was modified last time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }

    /// `DateTime` when this `Reservation` was confirmed, if it was.
    #[must_use]
    pub fn confirmed_at(&self) -> Option<DateTime> {
        self.0.confirmed_at.map(|d| d.coerce())
    }

    /// `DateTime` when this `Reservation` was completed, if it was.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime> {
        self.0.completed_at.map(|d| d.coerce())
    }
}

/// Unique identifier of a `Reservation`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::reservation::Id)]
#[into(domain::reservation::Id)]
#[graphql(name = "ReservationId", transparent)]
pub struct Id(Uuid);

/// Price snapshot of a [`Reservation`].
#[derive(Clone, Copy, Debug, From)]
pub struct Price(domain::reservation::Price);

/// Price snapshot of a `Reservation`, fixed at its creation.
#[graphql_object(context = Context)]
impl Price {
    /// Price of a single night.
    #[must_use]
    pub fn daily_rate(&self) -> Money {
        self.0.daily_rate
    }

    /// Price of all the nights.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.0.subtotal
    }

    /// Platform service fee.
    #[must_use]
    pub fn service_fee(&self) -> Money {
        self.0.service_fee
    }

    /// One-time cleaning fee.
    #[must_use]
    pub fn cleaning_fee(&self) -> Money {
        self.0.cleaning_fee
    }

    /// Refundable security deposit.
    #[must_use]
    pub fn security_deposit(&self) -> Money {
        self.0.security_deposit
    }

    /// Total amount the guest pays.
    #[must_use]
    pub fn total(&self) -> Money {
        self.0.total
    }
}

/// Details of a [`Reservation`] cancellation.
#[derive(Clone, Debug, From)]
pub struct Cancellation(domain::reservation::Cancellation);

/// Details of a `Reservation` cancellation.
#[graphql_object(context = Context)]
impl Cancellation {
    /// Stated reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.0.reason.as_ref()
    }

    /// ID of the user who cancelled, if it wasn't the payment provider.
    #[must_use]
    pub fn cancelled_by(&self) -> Option<UserId> {
        self.0.cancelled_by.map(Into::into)
    }

    /// `DateTime` of the cancellation.
    #[must_use]
    pub fn cancelled_at(&self) -> DateTime {
        self.0.cancelled_at.coerce()
    }
}

/// Status of a `Reservation` booking.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "BookingStatus")]
pub enum BookingStatus {
    /// Awaiting the host decision.
    Pending,

    /// Accepted by the host or paid.
    Confirmed,

    /// Declined, cancelled or refunded.
    Cancelled,

    /// Stay has ended.
    Completed,
}

impl From<domain::reservation::BookingStatus> for BookingStatus {
    fn from(status: domain::reservation::BookingStatus) -> Self {
        use domain::reservation::BookingStatus as S;
        match status {
            S::Pending => Self::Pending,
            S::Confirmed => Self::Confirmed,
            S::Cancelled => Self::Cancelled,
            S::Completed => Self::Completed,
        }
    }
}

impl From<BookingStatus> for domain::reservation::BookingStatus {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Pending => Self::Pending,
            BookingStatus::Confirmed => Self::Confirmed,
            BookingStatus::Cancelled => Self::Cancelled,
            BookingStatus::Completed => Self::Completed,
        }
    }
}

/// Status of a `Reservation` payment.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "PaymentStatus")]
pub enum PaymentStatus {
    /// Not paid yet.
    Pending,

    /// Paid and refunded partially.
    Partial,

    /// Paid.
    Completed,

    /// Paid and refunded fully.
    Refunded,
}

impl From<domain::reservation::PaymentStatus> for PaymentStatus {
    fn from(status: domain::reservation::PaymentStatus) -> Self {
        use domain::reservation::PaymentStatus as S;
        match status {
            S::Pending => Self::Pending,
            S::Partial => Self::Partial,
            S::Completed => Self::Completed,
            S::Refunded => Self::Refunded,
        }
    }
}

/// Invoice of a [`Reservation`].
#[derive(Clone, Debug, From)]
pub struct Invoice(read::reservation::Invoice);

/// Invoice of a `Reservation`.
#[graphql_object(context = Context)]
impl Invoice {
    /// Human-readable number of this `Invoice`.
    #[must_use]
    pub fn number(&self) -> String {
        self.0.number.to_string()
    }

    /// ID of the invoiced `Reservation`.
    #[must_use]
    pub fn reservation_id(&self) -> Id {
        self.0.reservation_id.into()
    }

    /// ID of the reserved unit.
    #[must_use]
    pub fn unit_id(&self) -> UnitId {
        self.0.unit_id.into()
    }

    /// ID of the guest.
    #[must_use]
    pub fn guest_id(&self) -> UserId {
        self.0.guest_id.into()
    }

    /// ID of the host.
    #[must_use]
    pub fn host_id(&self) -> UserId {
        self.0.host_id.into()
    }

    /// Arrival `Date`.
    #[must_use]
    pub fn check_in(&self) -> Date {
        self.0.stay.check_in()
    }

    /// Departure `Date`.
    #[must_use]
    pub fn check_out(&self) -> Date {
        self.0.stay.check_out()
    }

    /// Number of invoiced nights.
    #[must_use]
    pub fn nights(&self) -> i32 {
        i32::try_from(self.0.nights).unwrap_or(i32::MAX)
    }

    /// Price of a single night.
    #[must_use]
    pub fn daily_rate(&self) -> Money {
        self.0.daily_rate
    }

    /// `InvoiceLineItem`s summing up to the `total`.
    #[must_use]
    pub fn line_items(&self) -> Vec<LineItem> {
        self.0.line_items.iter().copied().map(Into::into).collect()
    }

    /// Total amount.
    #[must_use]
    pub fn total(&self) -> Money {
        self.0.total
    }

    /// `PaymentStatus` of the `Reservation`.
    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        self.0.payment_status.into()
    }

    /// `Date` this `Invoice` is issued on.
    #[must_use]
    pub fn issued_on(&self) -> Date {
        self.0.issued_on
    }
}

/// Single line of an [`Invoice`].
#[derive(Clone, Copy, Debug, From)]
pub struct LineItem(read::reservation::LineItem);

/// Single line of an `Invoice`.
#[graphql_object(name = "InvoiceLineItem", context = Context)]
impl LineItem {
    /// Human-readable description of this line.
    #[must_use]
    pub fn description(&self) -> String {
        self.0.kind.to_string()
    }

    /// Amount of this line.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.0.amount
    }
}

/// Payment state of a [`Reservation`].
#[derive(Clone, Debug, From)]
pub struct PaymentDetails(read::reservation::PaymentDetails);

/// Payment state of a `Reservation`.
#[graphql_object(context = Context)]
impl PaymentDetails {
    /// ID of the `Reservation`.
    #[must_use]
    pub fn reservation_id(&self) -> Id {
        self.0.reservation_id.into()
    }

    /// Amount to be paid.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.0.amount
    }

    /// Amount refunded so far.
    #[must_use]
    pub fn refunded_amount(&self) -> Money {
        self.0.refunded_amount
    }

    /// `PaymentStatus` of the `Reservation`.
    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        self.0.payment_status.into()
    }

    /// `BookingStatus` of the `Reservation`.
    #[must_use]
    pub fn booking_status(&self) -> BookingStatus {
        self.0.booking_status.into()
    }

    /// ID of the payment intent, if any.
    #[must_use]
    pub fn intent_id(&self) -> Option<payment::IntentId> {
        self.0.intent_id.clone().map(Into::into)
    }
}

pub mod list {
    //! Definitions related to [`Reservation`] list.

    use juniper::{graphql_object, GraphQLEnum};
    use service::read;

    use crate::{api::Reservation, Context};

    /// Role of the authenticated user in the listed `Reservation`s.
    #[derive(Clone, Copy, Debug, Default, GraphQLEnum)]
    #[graphql(name = "ReservationRole")]
    pub enum Role {
        /// Staying guest.
        Guest,

        /// Hosting user.
        Host,

        /// Either of the two.
        #[default]
        Any,
    }

    impl From<Role> for read::reservation::list::Role {
        fn from(role: Role) -> Self {
            match role {
                Role::Guest => Self::Guest,
                Role::Host => Self::Host,
                Role::Any => Self::Any,
            }
        }
    }

    /// Page of the [`Reservation`] list.
    #[derive(Clone, Debug, derive_more::From)]
    pub struct Page(read::reservation::list::Page);

    /// Page of the `Reservation` list.
    #[graphql_object(name = "ReservationPage", context = Context)]
    impl Page {
        /// `Reservation`s on this page.
        #[must_use]
        pub fn items(&self) -> Vec<Reservation> {
            self.0.items.iter().cloned().map(Into::into).collect()
        }

        /// 1-based number of this page.
        #[must_use]
        pub fn page(&self) -> i32 {
            i32::try_from(self.0.arguments.page()).unwrap_or(i32::MAX)
        }

        /// Total number of `Reservation`s across all pages.
        #[must_use]
        pub fn total_count(&self) -> i32 {
            i32::try_from(self.0.total).unwrap_or(i32::MAX)
        }

        /// Total number of pages.
        #[must_use]
        pub fn total_pages(&self) -> i32 {
            i32::try_from(self.0.total_pages()).unwrap_or(i32::MAX)
        }

        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.0.has_next()
        }
    }
}
