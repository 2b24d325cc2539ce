//! [`PaymentProvider`]-related implementations.

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod retry;
pub mod stripe;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "mock"))]
pub use self::mock::Mock;
pub use self::stripe::Stripe;

/// Payment provider operation.
pub use common::Handler as PaymentProvider;

/// Raw webhook delivery of a [`PaymentProvider`], to be verified.
#[derive(Clone, Debug)]
pub struct Payload {
    /// Raw request body, exactly as received.
    pub body: Vec<u8>,

    /// Signature header value.
    pub signature: String,
}

/// [`PaymentProvider`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// HTTP request to the provider failed.
    #[display("HTTP request failed: {_0}")]
    Http(reqwest::Error),

    /// Provider rejected the request.
    #[display("Provider rejected the request with `{status}` status: {message}")]
    #[from(ignore)]
    Rejected {
        /// HTTP status code of the rejection.
        status: u16,

        /// Message explaining the rejection.
        message: String,
    },

    /// Provider responded with something unexpected.
    #[display("Unexpected provider response: {_0}")]
    #[from(ignore)]
    UnexpectedResponse(#[error(not(source))] String),

    /// Webhook signature doesn't match the payload.
    #[display("Invalid webhook signature: {_0}")]
    Signature(stripe::SignatureError),

    /// Authentic webhook payload is malformed.
    #[display("Malformed webhook payload: {_0}")]
    MalformedEvent(serde_json::Error),
}

impl Error {
    /// Indicates whether retrying the failed request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::UnexpectedResponse(_)
            | Self::Signature(_)
            | Self::MalformedEvent(_) => false,
        }
    }
}
