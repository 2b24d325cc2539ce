//! Payment [`Intent`] definitions.

use std::fmt;

use common::Money;
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::domain::{payment::Method, reservation, unit, user, Reservation};

/// Provider-side attempt to collect the [`Reservation`] total from a guest.
#[derive(Clone, Debug)]
pub struct Intent {
    /// ID of this [`Intent`].
    pub id: Id,

    /// [`Status`] of this [`Intent`].
    pub status: Status,

    /// Amount being collected.
    pub amount: Money,

    /// [`ClientSecret`] for completing this [`Intent`] on the client side,
    /// if the provider returned it.
    pub client_secret: Option<ClientSecret>,
}

/// ID of an [`Intent`], assigned by the provider.
#[derive(
    AsRef,
    Clone,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(String);

impl Id {
    /// Creates a new [`Id`] out of the provided raw value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Status of an [`Intent`], as reported by the provider.
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
    /// Awaiting a payment method.
    RequiresPaymentMethod,

    /// Awaiting a confirmation.
    RequiresConfirmation,

    /// Awaiting a customer action (3-D Secure, for example).
    RequiresAction,

    /// Being processed.
    Processing,

    /// Authorized and awaiting a capture.
    RequiresCapture,

    /// Canceled and cannot be used anymore.
    Canceled,

    /// Paid.
    Succeeded,
}

/// Secret the client completes an [`Intent`] with.
#[derive(AsRef, Clone, Deserialize, Eq, PartialEq)]
#[as_ref(str)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Creates a new [`ClientSecret`] out of the provided raw value.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(***)")
    }
}

/// Request to create a new [`Intent`].
#[derive(Clone, Debug)]
pub struct Draft {
    /// Amount to collect.
    pub amount: Money,

    /// [`Method`] to collect with.
    pub method: Method,

    /// [`Metadata`] attached to the [`Intent`].
    pub metadata: Metadata,

    /// Key deduplicating retries of the same creation on the provider side.
    pub idempotency_key: String,
}

impl Draft {
    /// Creates a new [`Draft`] collecting the total of the provided
    /// [`Reservation`].
    ///
    /// A `replaced` [`Intent`] changes the idempotency key, so the provider
    /// creates a fresh [`Intent`] instead of returning the replaced one.
    #[must_use]
    pub fn new(
        reservation: &Reservation,
        method: Method,
        replaced: Option<&Id>,
    ) -> Self {
        let idempotency_key = match replaced {
            Some(id) => format!("{}:create-intent:{id}", reservation.id),
            None => format!("{}:create-intent", reservation.id),
        };
        Self {
            amount: reservation.price.total,
            method,
            metadata: Metadata {
                reservation_id: reservation.id,
                guest_id: reservation.guest_id,
                host_id: reservation.host_id,
                unit_id: reservation.unit_id,
            },
            idempotency_key,
        }
    }
}

/// Identifiers attached to an [`Intent`], so its events can be matched back
/// to the [`Reservation`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Metadata {
    /// ID of the paid [`Reservation`].
    pub reservation_id: reservation::Id,

    /// ID of the paying guest.
    pub guest_id: user::Id,

    /// ID of the host being paid.
    pub host_id: user::Id,

    /// ID of the reserved unit.
    pub unit_id: unit::Id,
}
