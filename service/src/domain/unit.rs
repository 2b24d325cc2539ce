//! [`Unit`] definitions.

use common::{define_kind, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

/// Rentable unit listed by a host.
///
/// Owned by the listings service: reservations only read it to validate a
/// stay and snapshot its prices.
#[derive(Clone, Debug)]
pub struct Unit {
    /// ID of this [`Unit`].
    pub id: Id,

    /// ID of the user hosting this [`Unit`].
    pub host_id: user::Id,

    /// Price of a month (30 nights) of stay.
    pub monthly_price: Money,

    /// One-time cleaning fee charged per stay.
    pub cleaning_fee: Money,

    /// Refundable security deposit charged per stay, if any.
    pub security_deposit: Option<Money>,

    /// Minimum length of a stay, in weeks.
    pub min_stay_weeks: u16,

    /// Maximum length of a stay, in calendar months.
    pub max_stay_months: u16,

    /// Maximum number of guests.
    pub max_guests: u16,

    /// [`Status`] of this [`Unit`].
    pub status: Status,
}

impl Unit {
    /// Indicates whether this [`Unit`] accepts reservations.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

/// ID of a [`Unit`].
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

define_kind! {
    #[doc = "Status of a [`Unit`] listing."]
    enum Status {
        #[doc = "Listed and accepting reservations."]
        Active = 1,

        #[doc = "Unlisted by its host."]
        Inactive = 2,

        #[doc = "Awaiting moderation."]
        Pending = 3,
    }
}
