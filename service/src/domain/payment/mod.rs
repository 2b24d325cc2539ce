//! Payment definitions shared with a payment provider.

pub mod intent;
pub mod refund;

use common::Money;
use derive_more::{AsRef, Display, From};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::domain::reservation;

pub use self::{intent::Intent, refund::Refund};

/// Method a guest pays with.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Method {
    /// Bank card.
    #[default]
    Card,

    /// SEPA direct debit.
    SepaDebit,
}

/// Verified notification of a payment provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    /// ID of this [`Event`], assigned by the provider.
    pub id: EventId,

    /// What has happened.
    pub kind: EventKind,
}

/// ID of an [`Event`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, PartialEq)]
#[as_ref(str)]
pub struct EventId(String);

impl EventId {
    /// Creates a new [`EventId`] out of the provided raw value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Kind of a payment provider [`Event`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventKind {
    /// Payment [`Intent`] has succeeded.
    PaymentSucceeded {
        /// ID of the succeeded [`Intent`].
        intent_id: intent::Id,

        /// ID of the paid [`Reservation`], if the [`Intent`] carries it.
        ///
        /// [`Reservation`]: crate::domain::Reservation
        reservation_id: Option<reservation::Id>,
    },

    /// Payment attempt of an [`Intent`] has failed.
    PaymentFailed {
        /// ID of the failed [`Intent`].
        intent_id: intent::Id,

        /// ID of the [`Reservation`] being paid, if the [`Intent`] carries
        /// it.
        ///
        /// [`Reservation`]: crate::domain::Reservation
        reservation_id: Option<reservation::Id>,
    },

    /// Charge of an [`Intent`] has been refunded, fully or partially.
    ChargeRefunded {
        /// ID of the [`Intent`] the refunded charge belongs to.
        intent_id: intent::Id,

        /// ID of the refunded [`Reservation`], if the charge carries it.
        ///
        /// [`Reservation`]: crate::domain::Reservation
        reservation_id: Option<reservation::Id>,

        /// Charged amount.
        amount: Money,

        /// Cumulative refunded amount.
        amount_refunded: Money,
    },

    /// [`Event`] of a type nobody is interested in.
    Unknown(String),
}

impl EventKind {
    /// Returns the ID of the [`Intent`] this [`EventKind`] is about, if any.
    #[must_use]
    pub fn intent_id(&self) -> Option<&intent::Id> {
        match self {
            Self::PaymentSucceeded { intent_id, .. }
            | Self::PaymentFailed { intent_id, .. }
            | Self::ChargeRefunded { intent_id, .. } => Some(intent_id),
            Self::Unknown(_) => None,
        }
    }

    /// Returns the ID of the [`Reservation`] this [`EventKind`] is about, if
    /// it's known.
    ///
    /// [`Reservation`]: crate::domain::Reservation
    #[must_use]
    pub fn reservation_id(&self) -> Option<reservation::Id> {
        match self {
            Self::PaymentSucceeded { reservation_id, .. }
            | Self::PaymentFailed { reservation_id, .. }
            | Self::ChargeRefunded { reservation_id, .. } => *reservation_id,
            Self::Unknown(_) => None,
        }
    }
}
