//! [Stripe] [`PaymentProvider`] implementation.
//!
//! [Stripe]: https://stripe.com

pub mod event;
pub mod signature;

use std::{sync::Arc, time::Duration};

use common::{
    money::Currency,
    operations::{By, Insert, Select, Verify},
    DateTime, Money,
};
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use tracerr::Traced;

use crate::{
    domain::payment::{intent, refund, Event, Intent, Refund},
    infra::payment::{self, retry, Payload, PaymentProvider},
};

pub use self::signature::SignatureError;

/// Default [Stripe] API base URL.
///
/// [Stripe]: https://stripe.com
pub const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// [`Stripe`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Secret API key.
    pub api_key: SecretString,

    /// Secret the webhook deliveries are signed with.
    pub webhook_secret: SecretString,

    /// Maximum age of an accepted webhook signature.
    pub webhook_tolerance: Duration,

    /// [`Currency`] the payments are collected in.
    pub currency: Currency,

    /// API base URL.
    pub base_url: String,

    /// Timeout of a single HTTP request.
    pub timeout: Duration,

    /// [`retry::Config`] of the idempotent requests.
    pub retry: retry::Config,
}

/// [Stripe] [`PaymentProvider`].
///
/// [Stripe]: https://stripe.com
#[derive(Clone, Debug)]
pub struct Stripe {
    /// Shared [`Inner`] state.
    inner: Arc<Inner>,
}

/// Shared state of a [`Stripe`] client.
#[derive(Debug)]
struct Inner {
    /// HTTP client.
    http: reqwest::Client,

    /// [`Config`] of this client.
    config: Config,
}

impl Stripe {
    /// Creates a new [`Stripe`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, Traced<payment::Error>> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> payment::Error))?;
        Ok(Self {
            inner: Arc::new(Inner { http, config }),
        })
    }

    /// Returns the [`Config`] of this client.
    fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Prepares an authorized POST request to the provided API `path`.
    fn post(&self, path: &str) -> RequestBuilder {
        self.inner
            .http
            .post(format!("{}{path}", self.config().base_url))
            .bearer_auth(self.config().api_key.expose_secret())
    }

    /// Prepares an authorized GET request to the provided API `path`.
    fn get(&self, path: &str) -> RequestBuilder {
        self.inner
            .http
            .get(format!("{}{path}", self.config().base_url))
            .bearer_auth(self.config().api_key.expose_secret())
    }
}

/// Sends the provided `request` and parses its response body as `T`.
async fn send<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<T, Traced<payment::Error>> {
    /// Error body of a rejected request.
    #[derive(Deserialize)]
    struct Rejection {
        /// Rejection details.
        error: RejectionDetails,
    }

    /// Details of a [`Rejection`].
    #[derive(Deserialize)]
    struct RejectionDetails {
        /// Human-readable message.
        message: Option<String>,
    }

    let response = request
        .send()
        .await
        .map_err(tracerr::from_and_wrap!(=> payment::Error))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(tracerr::from_and_wrap!(=> payment::Error))?;

    if status.is_success() {
        return serde_json::from_slice(&body).map_err(|e| {
            tracerr::new!(payment::Error::UnexpectedResponse(e.to_string()))
        });
    }

    let message = serde_json::from_slice::<Rejection>(&body)
        .ok()
        .and_then(|r| r.error.message)
        .unwrap_or_else(|| status.to_string());
    Err(tracerr::new!(payment::Error::Rejected {
        status: status.as_u16(),
        message,
    }))
}

/// Intent object of the API.
#[derive(Deserialize)]
struct IntentObject {
    /// ID of the intent.
    id: intent::Id,

    /// Status of the intent.
    status: intent::Status,

    /// Amount in minor units.
    amount: i64,

    /// Secret to complete the intent with on the client side.
    client_secret: Option<String>,
}

impl From<IntentObject> for Intent {
    fn from(obj: IntentObject) -> Self {
        Self {
            id: obj.id,
            status: obj.status,
            amount: Money::from_minor(obj.amount),
            client_secret: obj.client_secret.map(intent::ClientSecret::new),
        }
    }
}

/// Refund object of the API.
#[derive(Deserialize)]
struct RefundObject {
    /// ID of the refund.
    id: refund::Id,

    /// Amount in minor units.
    amount: i64,

    /// Status of the refund.
    status: refund::Status,
}

impl PaymentProvider<Insert<intent::Draft>> for Stripe {
    type Ok = Intent;
    type Err = Traced<payment::Error>;

    async fn execute(
        &self,
        Insert(draft): Insert<intent::Draft>,
    ) -> Result<Self::Ok, Self::Err> {
        let intent::Draft {
            amount,
            method,
            metadata,
            idempotency_key,
        } = draft;
        let method: &'static str = method.into();
        let form = [
            ("amount", amount.minor().to_string()),
            ("currency", self.config().currency.code().to_owned()),
            ("payment_method_types[]", method.to_owned()),
            (
                "metadata[reservation_id]",
                metadata.reservation_id.to_string(),
            ),
            ("metadata[guest_id]", metadata.guest_id.to_string()),
            ("metadata[host_id]", metadata.host_id.to_string()),
            ("metadata[unit_id]", metadata.unit_id.to_string()),
        ];

        let obj: IntentObject = retry::with_backoff(
            self.config().retry,
            "create payment intent",
            || {
                send(
                    self.post("/v1/payment_intents")
                        .header("Idempotency-Key", &idempotency_key)
                        .form(&form),
                )
            },
            |e: &Traced<payment::Error>| e.as_ref().is_transient(),
        )
        .await
        .map_err(tracerr::wrap!())?;
        Ok(obj.into())
    }
}

impl PaymentProvider<Select<By<Intent, intent::Id>>> for Stripe {
    type Ok = Intent;
    type Err = Traced<payment::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Intent, intent::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let path = format!("/v1/payment_intents/{}", by.as_inner());

        let obj: IntentObject = retry::with_backoff(
            self.config().retry,
            "retrieve payment intent",
            || send(self.get(&path)),
            |e: &Traced<payment::Error>| e.as_ref().is_transient(),
        )
        .await
        .map_err(tracerr::wrap!())?;
        Ok(obj.into())
    }
}

impl PaymentProvider<Insert<refund::Draft>> for Stripe {
    type Ok = Refund;
    type Err = Traced<payment::Error>;

    async fn execute(
        &self,
        Insert(draft): Insert<refund::Draft>,
    ) -> Result<Self::Ok, Self::Err> {
        let refund::Draft {
            intent_id,
            amount,
            reason,
        } = draft;
        let mut form = vec![
            ("payment_intent", intent_id.to_string()),
            ("amount", amount.minor().to_string()),
        ];
        if let Some(reason) = reason {
            form.push(("metadata[reason]", reason.as_ref().to_owned()));
        }

        // Refunds are never retried.
        let obj: RefundObject = send(self.post("/v1/refunds").form(&form))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(Refund {
            id: obj.id,
            amount: Money::from_minor(obj.amount),
            status: obj.status,
        })
    }
}

impl PaymentProvider<Verify<Payload>> for Stripe {
    type Ok = Event;
    type Err = Traced<payment::Error>;

    async fn execute(
        &self,
        Verify(payload): Verify<Payload>,
    ) -> Result<Self::Ok, Self::Err> {
        signature::verify(
            &payload.body,
            &payload.signature,
            self.config().webhook_secret.expose_secret(),
            self.config().webhook_tolerance,
            DateTime::now(),
        )
        .map_err(tracerr::from_and_wrap!(=> payment::Error))?;

        event::parse(&payload.body)
            .map_err(tracerr::from_and_wrap!(=> payment::Error))
    }
}
