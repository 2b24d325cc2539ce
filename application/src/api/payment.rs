//! Payment-related definitions.

use common::Money;
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain::payment;

use crate::Context;

/// Payment intent collecting a reservation total.
#[derive(Clone, Debug, From)]
pub struct Intent(payment::Intent);

/// Provider-side attempt to collect a `Reservation` total from its guest.
#[graphql_object(name = "PaymentIntent", context = Context)]
impl Intent {
    /// Unique identifier of this `PaymentIntent`.
    #[must_use]
    pub fn id(&self) -> IntentId {
        self.0.id.clone().into()
    }

    /// `PaymentIntentStatus` reported by the provider.
    #[must_use]
    pub fn status(&self) -> IntentStatus {
        self.0.status.into()
    }

    /// Amount being collected.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.0.amount
    }

    /// Secret completing this `PaymentIntent` on the client side, if any.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.0.client_secret.as_ref().map(AsRef::as_ref)
    }
}

/// Identifier of a payment intent, assigned by the provider.
#[derive(Clone, Debug, Display, Into, From, GraphQLScalar)]
#[from(payment::intent::Id)]
#[into(payment::intent::Id)]
#[graphql(name = "PaymentIntentId", transparent)]
pub struct IntentId(String);

/// Status of a payment intent.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "PaymentIntentStatus")]
pub enum IntentStatus {
    /// Awaiting a payment method.
    RequiresPaymentMethod,

    /// Awaiting a confirmation.
    RequiresConfirmation,

    /// Awaiting a customer action.
    RequiresAction,

    /// Being processed.
    Processing,

    /// Authorized and awaiting a capture.
    RequiresCapture,

    /// Canceled.
    Canceled,

    /// Paid.
    Succeeded,
}

impl From<payment::intent::Status> for IntentStatus {
    fn from(status: payment::intent::Status) -> Self {
        use payment::intent::Status as S;
        match status {
            S::RequiresPaymentMethod => Self::RequiresPaymentMethod,
            S::RequiresConfirmation => Self::RequiresConfirmation,
            S::RequiresAction => Self::RequiresAction,
            S::Processing => Self::Processing,
            S::RequiresCapture => Self::RequiresCapture,
            S::Canceled => Self::Canceled,
            S::Succeeded => Self::Succeeded,
        }
    }
}

/// Method a guest pays with.
#[derive(Clone, Copy, Debug, Default, GraphQLEnum)]
#[graphql(name = "PaymentMethod")]
pub enum Method {
    /// Bank card.
    #[default]
    Card,

    /// SEPA direct debit.
    SepaDebit,
}

impl From<Method> for payment::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Card => Self::Card,
            Method::SepaDebit => Self::SepaDebit,
        }
    }
}

/// Money returned to a guest.
#[derive(Clone, Debug, From)]
pub struct Refund(payment::Refund);

/// Money returned to a guest out of a succeeded `PaymentIntent`.
#[graphql_object(context = Context)]
impl Refund {
    /// Unique identifier of this `Refund`, assigned by the provider.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.id.as_ref()
    }

    /// Refunded amount.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.0.amount
    }

    /// `RefundStatus` reported by the provider.
    #[must_use]
    pub fn status(&self) -> RefundStatus {
        self.0.status.into()
    }
}

/// Status of a refund.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
pub enum RefundStatus {
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

impl From<payment::refund::Status> for RefundStatus {
    fn from(status: payment::refund::Status) -> Self {
        use payment::refund::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::RequiresAction => Self::RequiresAction,
            S::Succeeded => Self::Succeeded,
            S::Failed => Self::Failed,
            S::Canceled => Self::Canceled,
        }
    }
}
