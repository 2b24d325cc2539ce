//! Payment [`Refund`] definitions.

use common::Money;
use derive_more::{AsRef, Display, From};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::domain::{payment::intent, reservation::CancellationReason};

/// Money returned to a guest out of a succeeded [`intent::Intent`].
#[derive(Clone, Debug)]
pub struct Refund {
    /// ID of this [`Refund`].
    pub id: Id,

    /// Refunded amount.
    pub amount: Money,

    /// [`Status`] of this [`Refund`].
    pub status: Status,
}

/// ID of a [`Refund`], assigned by the provider.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, From, Hash, PartialEq, Serialize,
)]
#[as_ref(str)]
pub struct Id(String);

impl Id {
    /// Creates a new [`Id`] out of the provided raw value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Status of a [`Refund`], as reported by the provider.
#[derive(
    Clone,
    Copy,
    Debug,
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
pub enum Status {
    /// Being processed.
    Pending,

    /// Awaiting a customer action.
    RequiresAction,

    /// Returned to the guest.
    Succeeded,

    /// Failed.
    Failed,

    /// Canceled.
    Canceled,
}

/// Request to create a new [`Refund`].
#[derive(Clone, Debug)]
pub struct Draft {
    /// ID of the [`intent::Intent`] to refund.
    pub intent_id: intent::Id,

    /// Amount to refund.
    pub amount: Money,

    /// Stated reason, if any.
    pub reason: Option<CancellationReason>,
}
