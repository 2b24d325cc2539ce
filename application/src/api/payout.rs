//! [`Payout`]-related definitions.

use common::{DateTime, Money};
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, read};
use uuid::Uuid;

use crate::{
    api::{reservation, UserId},
    Context,
};

/// Transfer of a host's earnings.
#[derive(Clone, Debug, From)]
pub struct Payout(domain::Payout);

/// Transfer of a host's earnings for a single `Reservation`.
#[graphql_object(context = Context)]
impl Payout {
    /// Unique identifier of this `Payout`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the host receiving this `Payout`.
    #[must_use]
    pub fn host_id(&self) -> UserId {
        self.0.host_id.into()
    }

    /// ID of the paid out `Reservation`.
    #[must_use]
    pub fn reservation_id(&self) -> reservation::Id {
        self.0.reservation_id.into()
    }

    /// Host's part of the `Reservation` price.
    #[must_use]
    pub fn gross_amount(&self) -> Money {
        self.0.gross_amount
    }

    /// Fee the platform keeps.
    #[must_use]
    pub fn platform_fee(&self) -> Money {
        self.0.platform_fee
    }

    /// Amount transferred to the host.
    #[must_use]
    pub fn net_amount(&self) -> Money {
        self.0.net_amount
    }

    /// `PayoutStatus` of this `Payout`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// `DateTime` this `Payout` is scheduled for.
    #[must_use]
    pub fn scheduled_for(&self) -> DateTime {
        self.0.scheduled_for.coerce()
    }

    /// `DateTime` when this `Payout` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Payout`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::payout::Id)]
#[into(domain::payout::Id)]
#[graphql(name = "PayoutId", transparent)]
pub struct Id(Uuid);

/// Status of a `Payout`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "PayoutStatus")]
pub enum Status {
    /// Awaiting its schedule.
    Pending,

    /// Being transferred.
    Processing,

    /// Transferred.
    Completed,

    /// Transfer failed.
    Failed,
}

impl From<domain::payout::Status> for Status {
    fn from(status: domain::payout::Status) -> Self {
        use domain::payout::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::Processing => Self::Processing,
            S::Completed => Self::Completed,
            S::Failed => Self::Failed,
        }
    }
}

impl From<Status> for domain::payout::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::Processing => Self::Processing,
            Status::Completed => Self::Completed,
            Status::Failed => Self::Failed,
        }
    }
}

/// [`Payout`]s created at once.
#[derive(Clone, Debug, From)]
pub struct Batch(read::payout::Batch);

/// `Payout`s created by a single request, along with their sums.
#[graphql_object(name = "PayoutBatch", context = Context)]
impl Batch {
    /// Created `Payout`s.
    #[must_use]
    pub fn payouts(&self) -> Vec<Payout> {
        self.0.payouts.iter().cloned().map(Into::into).collect()
    }

    /// Number of created `Payout`s.
    #[must_use]
    pub fn count(&self) -> i32 {
        i32::try_from(self.0.totals.count).unwrap_or(i32::MAX)
    }

    /// Sum of gross amounts.
    #[must_use]
    pub fn gross_amount(&self) -> Money {
        self.0.totals.gross_amount
    }

    /// Sum of platform fees.
    #[must_use]
    pub fn platform_fee(&self) -> Money {
        self.0.totals.platform_fee
    }

    /// Sum of net amounts.
    #[must_use]
    pub fn net_amount(&self) -> Money {
        self.0.totals.net_amount
    }
}

pub mod list {
    //! Definitions related to [`Payout`] list.

    use juniper::graphql_object;
    use service::read;

    use crate::{api::Payout, Context};

    /// Page of the [`Payout`] list.
    #[derive(Clone, Debug, derive_more::From)]
    pub struct Page(read::payout::list::Page);

    /// Page of the `Payout` list.
    #[graphql_object(name = "PayoutPage", context = Context)]
    impl Page {
        /// `Payout`s on this page.
        #[must_use]
        pub fn items(&self) -> Vec<Payout> {
            self.0.items.iter().cloned().map(Into::into).collect()
        }

        /// 1-based number of this page.
        #[must_use]
        pub fn page(&self) -> i32 {
            i32::try_from(self.0.arguments.page()).unwrap_or(i32::MAX)
        }

        /// Total number of `Payout`s across all pages.
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
