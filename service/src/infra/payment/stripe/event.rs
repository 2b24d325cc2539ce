//! Parsing of webhook [`Event`]s.

use common::Money;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{
    payment::{intent, Event, EventId, EventKind},
    reservation,
};

/// Envelope of every webhook [`Event`].
#[derive(Debug, Deserialize)]
struct Envelope {
    /// ID of the [`Event`].
    id: String,

    /// Type of the [`Event`].
    #[serde(rename = "type")]
    kind: String,

    /// Payload of the [`Event`].
    data: Data,
}

/// Payload of an [`Envelope`].
#[derive(Debug, Deserialize)]
struct Data {
    /// Object the [`Event`] is about.
    object: Value,
}

/// Payment intent object.
#[derive(Debug, Deserialize)]
struct IntentObject {
    /// ID of the intent.
    id: intent::Id,

    /// [`Metadata`] attached on the intent creation.
    #[serde(default)]
    metadata: Metadata,
}

/// Charge object.
#[derive(Debug, Deserialize)]
struct ChargeObject {
    /// ID of the intent the charge belongs to.
    payment_intent: Option<intent::Id>,

    /// Charged amount, in minor units.
    amount: i64,

    /// Cumulative refunded amount, in minor units.
    amount_refunded: i64,

    /// [`Metadata`] copied from the intent.
    #[serde(default)]
    metadata: Metadata,
}

/// Metadata attached to provider objects.
#[derive(Debug, Default, Deserialize)]
struct Metadata {
    /// ID of the reservation, if attached.
    reservation_id: Option<String>,
}

impl Metadata {
    /// Returns the attached reservation ID, ignoring an unparsable one.
    fn reservation_id(&self) -> Option<reservation::Id> {
        self.reservation_id.as_deref().and_then(|id| id.parse().ok())
    }
}

/// Parses the provided raw webhook `body` into an [`Event`].
///
/// Both the provider's native event types and their provider-neutral aliases
/// (`payment.succeeded`, `payment.failed`) are recognized. Any other type is
/// parsed as [`EventKind::Unknown`].
///
/// # Errors
///
/// If the `body` is not a well-formed event of its type.
pub fn parse(body: &[u8]) -> Result<Event, serde_json::Error> {
    let Envelope { id, kind, data } = serde_json::from_slice(body)?;

    let kind = match kind.as_str() {
        "payment_intent.succeeded" | "payment.succeeded" => {
            let obj: IntentObject = serde_json::from_value(data.object)?;
            EventKind::PaymentSucceeded {
                reservation_id: obj.metadata.reservation_id(),
                intent_id: obj.id,
            }
        }
        "payment_intent.payment_failed" | "payment.failed" => {
            let obj: IntentObject = serde_json::from_value(data.object)?;
            EventKind::PaymentFailed {
                reservation_id: obj.metadata.reservation_id(),
                intent_id: obj.id,
            }
        }
        "charge.refunded" => {
            let obj: ChargeObject = serde_json::from_value(data.object)?;
            match obj.payment_intent {
                Some(intent_id) => EventKind::ChargeRefunded {
                    reservation_id: obj.metadata.reservation_id(),
                    intent_id,
                    amount: Money::from_minor(obj.amount),
                    amount_refunded: Money::from_minor(obj.amount_refunded),
                },
                // Charges outside of payment intents are not ours.
                None => EventKind::Unknown(kind),
            }
        }
        _ => EventKind::Unknown(kind),
    };

    Ok(Event {
        id: EventId::new(id),
        kind,
    })
}

#[cfg(test)]
mod spec {
    use common::Money;
    use serde_json::json;

    use crate::domain::{
        payment::{intent, EventKind},
        reservation,
    };

    use super::parse;

    #[test]
    fn parses_succeeded_intent() {
        let reservation_id = reservation::Id::new();
        let body = json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {
                "id": "pi_1",
                "object": "payment_intent",
                "metadata": {"reservation_id": reservation_id.to_string()},
            }},
        });

        let event = parse(body.to_string().as_bytes()).unwrap();

        assert_eq!(event.id.as_ref(), "evt_1");
        assert_eq!(
            event.kind,
            EventKind::PaymentSucceeded {
                intent_id: intent::Id::new("pi_1"),
                reservation_id: Some(reservation_id),
            },
        );
    }

    #[test]
    fn accepts_neutral_aliases() {
        let body = json!({
            "id": "evt_2",
            "type": "payment.failed",
            "data": {"object": {"id": "pi_2"}},
        });

        let event = parse(body.to_string().as_bytes()).unwrap();

        assert_eq!(
            event.kind,
            EventKind::PaymentFailed {
                intent_id: intent::Id::new("pi_2"),
                reservation_id: None,
            },
        );
    }

    #[test]
    fn parses_refunded_charge() {
        let body = json!({
            "id": "evt_3",
            "type": "charge.refunded",
            "data": {"object": {
                "id": "ch_1",
                "payment_intent": "pi_3",
                "amount": 965_100,
                "amount_refunded": 100_000,
                "metadata": {"reservation_id": "not-a-uuid"},
            }},
        });

        let event = parse(body.to_string().as_bytes()).unwrap();

        assert_eq!(
            event.kind,
            EventKind::ChargeRefunded {
                intent_id: intent::Id::new("pi_3"),
                reservation_id: None,
                amount: Money::from_minor(965_100),
                amount_refunded: Money::from_minor(100_000),
            },
        );
    }

    #[test]
    fn keeps_unknown_types() {
        let body = json!({
            "id": "evt_4",
            "type": "customer.created",
            "data": {"object": {"id": "cus_1"}},
        });

        let event = parse(body.to_string().as_bytes()).unwrap();

        assert_eq!(event.kind, EventKind::Unknown("customer.created".into()));
    }

    #[test]
    fn rejects_malformed_known_types() {
        let body = json!({
            "id": "evt_5",
            "type": "charge.refunded",
            "data": {"object": {"id": "ch_1"}},
        });

        assert!(parse(body.to_string().as_bytes()).is_err());
        assert!(parse(b"not json").is_err());
    }
}
