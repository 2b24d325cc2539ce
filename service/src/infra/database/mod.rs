//! [`Database`]-related implementations.

#[cfg(any(test, feature = "mock"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "mock"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Names of the constraints guarding the stored invariants.
pub mod constraint {
    /// Exclusion constraint forbidding overlapping blocking reservations of
    /// the same unit.
    pub const RESERVATIONS_NO_OVERLAP: &str = "reservations_no_overlap";

    /// Unique index allowing at most one effective payout per reservation.
    pub const PAYOUTS_RESERVATION_ID_EFFECTIVE: &str =
        "payouts_reservation_id_effective_key";
}

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(any(test, feature = "mock"))]
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(any(test, feature = "mock"))]
            Self::Memory(e) => e.is_unique_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
        }
    }

    /// Checks if the error is an exclusion violation of the specified
    /// constraint.
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(any(test, feature = "mock"))]
            Self::Memory(e) => e.is_exclusion_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_exclusion_violation(constraint),
        }
    }
}
