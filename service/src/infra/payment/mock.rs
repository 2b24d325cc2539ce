//! In-memory [`PaymentProvider`] double.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use common::{
    operations::{By, Insert, Select, Verify},
    DateTime, Money,
};
use tracerr::Traced;

use crate::{
    domain::payment::{intent, refund, Event, Intent, Refund},
    infra::payment::{
        self,
        stripe::{event, signature},
        Payload, PaymentProvider,
    },
};

/// Maximum age of a webhook signature accepted by a [`Mock`].
const WEBHOOK_TOLERANCE: Duration = Duration::from_secs(300);

/// In-memory [`PaymentProvider`], behaving like [`Stripe`] does.
///
/// Clones share the same state.
///
/// [`Stripe`]: super::Stripe
#[derive(Clone, Debug)]
pub struct Mock {
    /// Shared [`State`].
    state: Arc<Mutex<State>>,

    /// Secret the webhook deliveries are signed with.
    webhook_secret: Arc<str>,
}

/// State of a [`Mock`].
#[derive(Debug, Default)]
struct State {
    /// Created [`Intent`]s.
    intents: HashMap<intent::Id, Intent>,

    /// [`Intent`]s by the idempotency keys they were created with.
    idempotency: HashMap<String, intent::Id>,

    /// Refunded amounts by [`Intent`]s.
    refunded: HashMap<intent::Id, Money>,

    /// Performed refunds.
    refunds: Vec<refund::Draft>,

    /// Errors the next requests fail with.
    failures: VecDeque<payment::Error>,

    /// Counter of the generated IDs.
    sequence: u64,
}

impl State {
    /// Generates a new unique ID with the provided `prefix`.
    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}_{:08}", self.sequence)
    }

    /// Fails the current request with the next queued error, if any.
    fn fail(&mut self) -> Result<(), Traced<payment::Error>> {
        match self.failures.pop_front() {
            Some(e) => Err(tracerr::new!(e)),
            None => Ok(()),
        }
    }
}

impl Mock {
    /// Creates a new [`Mock`] signing webhooks with the provided secret.
    #[must_use]
    pub fn new(webhook_secret: &str) -> Self {
        Self {
            state: Arc::default(),
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Returns the [`State`] of this [`Mock`].
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the [`intent::Status`] of an existing [`Intent`], as the guest
    /// paying it would do.
    pub fn set_intent_status(&self, id: &intent::Id, status: intent::Status) {
        if let Some(intent) = self.state().intents.get_mut(id) {
            intent.status = status;
        }
    }

    /// Makes the next request (other than a webhook verification) fail with
    /// the provided `error`.
    pub fn fail_next(&self, error: payment::Error) {
        self.state().failures.push_back(error);
    }

    /// Returns the number of created [`Intent`]s.
    #[must_use]
    pub fn created_intents(&self) -> usize {
        self.state().intents.len()
    }

    /// Returns all the performed refunds.
    #[must_use]
    pub fn refunds(&self) -> Vec<refund::Draft> {
        self.state().refunds.clone()
    }

    /// Signs the provided webhook `body` as delivered right now.
    #[must_use]
    pub fn sign(&self, body: impl Into<Vec<u8>>) -> Payload {
        let body = body.into();
        let signature = signature::sign(
            &body,
            &self.webhook_secret,
            DateTime::now().unix_timestamp(),
        );
        Payload { body, signature }
    }
}

impl PaymentProvider<Insert<intent::Draft>> for Mock {
    type Ok = Intent;
    type Err = Traced<payment::Error>;

    async fn execute(
        &self,
        Insert(draft): Insert<intent::Draft>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state();
        state.fail()?;

        if let Some(existing) = state
            .idempotency
            .get(&draft.idempotency_key)
            .and_then(|id| state.intents.get(id))
        {
            return Ok(existing.clone());
        }

        let id = intent::Id::new(state.next_id("pi"));
        let intent = Intent {
            client_secret: Some(intent::ClientSecret::new(format!(
                "{id}_secret"
            ))),
            id: id.clone(),
            status: intent::Status::RequiresPaymentMethod,
            amount: draft.amount,
        };
        _ = state.idempotency.insert(draft.idempotency_key, id.clone());
        _ = state.intents.insert(id, intent.clone());
        Ok(intent)
    }
}

impl PaymentProvider<Select<By<Intent, intent::Id>>> for Mock {
    type Ok = Intent;
    type Err = Traced<payment::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Intent, intent::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state();
        state.fail()?;

        state.intents.get(by.as_inner()).cloned().ok_or_else(|| {
            tracerr::new!(payment::Error::Rejected {
                status: 404,
                message: format!("No such payment_intent: `{}`", by.as_inner()),
            })
        })
    }
}

impl PaymentProvider<Insert<refund::Draft>> for Mock {
    type Ok = Refund;
    type Err = Traced<payment::Error>;

    async fn execute(
        &self,
        Insert(draft): Insert<refund::Draft>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state();
        state.fail()?;

        let reject = |status, message: String| {
            tracerr::new!(payment::Error::Rejected { status, message })
        };
        let Some(intent) = state.intents.get(&draft.intent_id) else {
            return Err(reject(
                404,
                format!("No such payment_intent: `{}`", draft.intent_id),
            ));
        };
        if intent.status != intent::Status::Succeeded {
            return Err(reject(
                400,
                format!("PaymentIntent `{}` has not succeeded", intent.id),
            ));
        }
        let refunded = state
            .refunded
            .get(&draft.intent_id)
            .copied()
            .unwrap_or_default();
        if refunded + draft.amount > intent.amount {
            return Err(reject(
                400,
                format!(
                    "Refund amount `{}` is greater than unrefunded amount",
                    draft.amount,
                ),
            ));
        }

        _ = state
            .refunded
            .insert(draft.intent_id.clone(), refunded + draft.amount);
        let refund = Refund {
            id: refund::Id::new(state.next_id("re")),
            amount: draft.amount,
            status: refund::Status::Succeeded,
        };
        state.refunds.push(draft);
        Ok(refund)
    }
}

impl PaymentProvider<Verify<Payload>> for Mock {
    type Ok = Event;
    type Err = Traced<payment::Error>;

    async fn execute(
        &self,
        Verify(payload): Verify<Payload>,
    ) -> Result<Self::Ok, Self::Err> {
        signature::verify(
            &payload.body,
            &payload.signature,
            &self.webhook_secret,
            WEBHOOK_TOLERANCE,
            DateTime::now(),
        )
        .map_err(tracerr::from_and_wrap!(=> payment::Error))?;

        event::parse(&payload.body)
            .map_err(tracerr::from_and_wrap!(=> payment::Error))
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Insert, Select, Verify},
        Money,
    };

    use crate::{
        domain::{
            payment::{intent, refund, EventKind, Method},
            reservation, unit, user,
        },
        infra::payment::{self, PaymentProvider as _, Payload},
    };

    use super::Mock;

    fn draft(key: &str) -> intent::Draft {
        intent::Draft {
            amount: Money::from_minor(10_000),
            method: Method::Card,
            metadata: intent::Metadata {
                reservation_id: reservation::Id::new(),
                guest_id: user::Id::new(),
                host_id: user::Id::new(),
                unit_id: unit::Id::new(),
            },
            idempotency_key: key.into(),
        }
    }

    #[tokio::test]
    async fn creates_intents_idempotently() {
        let mock = Mock::new("whsec");

        let first = mock.execute(Insert(draft("a"))).await.unwrap();
        let again = mock.execute(Insert(draft("a"))).await.unwrap();
        let other = mock.execute(Insert(draft("b"))).await.unwrap();

        assert_eq!(first.id, again.id);
        assert_ne!(first.id, other.id);
        assert_eq!(mock.created_intents(), 2);
    }

    #[tokio::test]
    async fn fails_queued_requests() {
        let mock = Mock::new("whsec");
        mock.fail_next(payment::Error::Rejected {
            status: 503,
            message: "unavailable".into(),
        });

        let err = mock.execute(Insert(draft("a"))).await.unwrap_err();
        assert!(err.as_ref().is_transient());

        let intent = mock.execute(Insert(draft("a"))).await.unwrap();
        let fetched = mock
            .execute(Select(By::<intent::Intent, _>::new(intent.id.clone())))
            .await
            .unwrap();
        assert_eq!(fetched.id, intent.id);
    }

    #[tokio::test]
    async fn refunds_only_succeeded_intents() {
        let mock = Mock::new("whsec");
        let intent = mock.execute(Insert(draft("a"))).await.unwrap();
        let refund = |amount| refund::Draft {
            intent_id: intent.id.clone(),
            amount: Money::from_minor(amount),
            reason: None,
        };

        assert!(mock.execute(Insert(refund(1_000))).await.is_err());

        mock.set_intent_status(&intent.id, intent::Status::Succeeded);
        let done = mock.execute(Insert(refund(6_000))).await.unwrap();
        assert_eq!(done.status, refund::Status::Succeeded);
        assert!(mock.execute(Insert(refund(6_000))).await.is_err());
        assert_eq!(mock.refunds().len(), 1);
    }

    #[tokio::test]
    async fn verifies_signed_webhooks() {
        let mock = Mock::new("whsec");
        let body = r#"{"id":"evt_1","type":"ping","data":{"object":{}}}"#;

        let event = mock.execute(Verify(mock.sign(body))).await.unwrap();
        assert_eq!(event.kind, EventKind::Unknown("ping".into()));

        let forged = Payload {
            body: body.into(),
            signature: Mock::new("other").sign(body).signature,
        };
        let err = mock.execute(Verify(forged)).await.unwrap_err();
        assert!(matches!(err.as_ref(), payment::Error::Signature(_)));
    }
}
