//! [`Payout`] definitions.

use std::time::Duration;

use common::{define_kind, marker, DateTime, DateTimeOf, Money, Percent};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{reservation, user, Reservation};

/// Transfer of a host's earnings for a single [`Reservation`].
///
/// Only one not [`Status::Failed`] [`Payout`] may exist per [`Reservation`].
#[derive(Clone, Debug)]
pub struct Payout {
    /// ID of this [`Payout`].
    pub id: Id,

    /// ID of the user receiving this [`Payout`].
    pub host_id: user::Id,

    /// ID of the [`Reservation`] this [`Payout`] is made for.
    pub reservation_id: reservation::Id,

    /// Host's part of the [`Reservation`] price.
    pub gross_amount: Money,

    /// Fee the platform keeps out of the `gross_amount`.
    pub platform_fee: Money,

    /// Amount transferred to the host.
    pub net_amount: Money,

    /// [`Status`] of this [`Payout`].
    pub status: Status,

    /// [`DateTime`] this [`Payout`] is scheduled for.
    pub scheduled_for: ScheduleDateTime,

    /// [`DateTime`] when this [`Payout`] was created.
    pub created_at: CreationDateTime,
}

impl Payout {
    /// Creates a new [`Status::Pending`] [`Payout`] of the provided
    /// [`Reservation`], scheduled the provided `delay` after `now`.
    #[must_use]
    pub fn new(
        reservation: &Reservation,
        platform_fee: Percent,
        delay: Duration,
        now: DateTime,
    ) -> Self {
        let gross_amount = reservation.price.host_gross();
        let platform_fee = platform_fee.of(gross_amount);
        Self {
            id: Id::new(),
            host_id: reservation.host_id,
            reservation_id: reservation.id,
            gross_amount,
            platform_fee,
            net_amount: gross_amount - platform_fee,
            status: Status::Pending,
            scheduled_for: (now + delay).coerce(),
            created_at: now.coerce(),
        }
    }
}

/// ID of a [`Payout`].
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
    #[doc = "Status of a [`Payout`]."]
    enum Status {
        #[doc = "Awaiting its schedule."]
        Pending = 1,

        #[doc = "Being transferred."]
        Processing = 2,

        #[doc = "Transferred."]
        Completed = 3,

        #[doc = "Transfer failed, so the [`Reservation`] may be paid out again."]
        Failed = 4,
    }
}

impl Status {
    /// Indicates whether a [`Payout`] in this [`Status`] pays the
    /// [`Reservation`] out.
    #[must_use]
    pub fn is_effective(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// [`DateTime`] when a [`Payout`] was created.
pub type CreationDateTime = DateTimeOf<(Payout, marker::Creation)>;

/// [`DateTime`] a [`Payout`] is scheduled for.
pub type ScheduleDateTime = DateTimeOf<(Payout, marker::Schedule)>;
