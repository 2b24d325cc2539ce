//! [`Payout`]-related read definitions.

use common::Money;

use crate::domain::{reservation, user, Payout};
#[cfg(doc)]
use crate::domain::Reservation;

/// Selector of [`Reservation`]s eligible for a [`Payout`].
///
/// A [`Reservation`] is eligible once it's completed and fully paid, and has
/// no effective [`Payout`] yet.
#[derive(Clone, Debug)]
pub struct Eligible {
    /// ID of the host to be paid out.
    pub host_id: user::Id,

    /// IDs of the [`Reservation`]s to narrow the selection to, if any.
    pub reservation_ids: Option<Vec<reservation::Id>>,
}

/// [`Payout`]s created at once, along with their [`Totals`].
#[derive(Clone, Debug)]
pub struct Batch {
    /// Created [`Payout`]s.
    pub payouts: Vec<Payout>,

    /// [`Totals`] of the created [`Payout`]s.
    pub totals: Totals,
}

impl From<Vec<Payout>> for Batch {
    fn from(payouts: Vec<Payout>) -> Self {
        let totals = payouts.iter().fold(Totals::default(), |mut t, p| {
            t.count += 1;
            t.gross_amount += p.gross_amount;
            t.platform_fee += p.platform_fee;
            t.net_amount += p.net_amount;
            t
        });
        Self { payouts, totals }
    }
}

/// Sums of a [`Batch`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Totals {
    /// Number of [`Payout`]s.
    pub count: usize,

    /// Sum of gross amounts.
    pub gross_amount: Money,

    /// Sum of platform fees.
    pub platform_fee: Money,

    /// Sum of net amounts.
    pub net_amount: Money,
}

pub mod list {
    //! [`Payout`] list definitions.

    use common::define_pagination;

    use crate::domain::{payout, user, Payout};

    define_pagination!(Payout, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// ID of the host whose [`Payout`]s are listed.
        pub host_id: user::Id,

        /// [`payout::Status`] to filter by, if any.
        pub status: Option<payout::Status>,
    }

    impl Filter {
        /// Indicates whether the provided [`Payout`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, payout: &Payout) -> bool {
            payout.host_id == self.host_id
                && self.status.map_or(true, |s| payout.status == s)
        }
    }
}
