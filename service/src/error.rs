//! Classification of [`Command`] and [`Query`] errors.
//!
//! [`Command`]: crate::Command
//! [`Query`]: crate::Query

use derive_more::Display;

use crate::infra::{database, payment};

/// Kind of a failure, stable across the operations.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Kind {
    /// Referenced entity doesn't exist.
    #[display("not found")]
    NotFound,

    /// Actor is not allowed to perform the operation.
    #[display("forbidden")]
    Forbidden,

    /// Provided arguments are invalid.
    #[display("invalid argument")]
    InvalidArgument,

    /// Operation is not allowed in the current state.
    #[display("invalid state")]
    InvalidState,

    /// Requested dates are taken.
    #[display("unavailable")]
    Unavailable,

    /// Reservation is paid already.
    #[display("already paid")]
    AlreadyPaid,

    /// Nothing to pay out.
    #[display("no eligible reservations")]
    NoEligibleReservations,

    /// Payment provider failed or rejected the request.
    #[display("payment provider error")]
    ProviderError,

    /// Webhook signature is invalid.
    #[display("invalid signature")]
    SignatureInvalid,

    /// Infrastructure failure.
    #[display("internal error")]
    Internal,
}

/// Error classifiable into a [`Kind`].
pub trait Classify {
    /// Returns the [`Kind`] of this error.
    fn kind(&self) -> Kind;
}

impl Classify for database::Error {
    fn kind(&self) -> Kind {
        Kind::Internal
    }
}

impl Classify for payment::Error {
    fn kind(&self) -> Kind {
        match self {
            Self::Signature(_) => Kind::SignatureInvalid,
            Self::MalformedEvent(_) => Kind::InvalidArgument,
            Self::Http(_)
            | Self::Rejected { .. }
            | Self::UnexpectedResponse(_) => Kind::ProviderError,
        }
    }
}
