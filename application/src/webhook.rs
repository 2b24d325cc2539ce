//! Payment provider webhook endpoint.

use axum::{
    body::Bytes,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use service::{
    command,
    error::{Classify as _, Kind},
    infra::payment,
    Command as _,
};
use tracing as log;

use crate::Service;

/// Name of the header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Body of an accepted webhook delivery.
#[derive(Clone, Copy, Debug, Serialize)]
struct Received {
    /// Always `true`.
    received: bool,
}

/// Body of a rejected webhook delivery.
#[derive(Clone, Copy, Debug, Serialize)]
struct Rejected {
    /// Code of the rejection.
    error: &'static str,
}

/// Payment provider webhook handler.
///
/// Answers `{"received": true}` to every verified delivery, including the
/// ones changing nothing, so the provider stops redelivering them. An
/// invalid signature is answered with `400 Bad Request`, and a failure to
/// apply a verified event with `500 Internal Server Error`, so the provider
/// redelivers it later.
#[tracing::instrument(skip_all, fields(otel.name = "Payment webhook"))]
pub async fn payments(
    Extension(service): Extension<Service>,
    headers: http::HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let result = service
        .execute(command::ProcessWebhook {
            payload: payment::Payload {
                body: body.to_vec(),
                signature,
            },
        })
        .await;
    match result {
        Ok(outcome) => {
            log::debug!("webhook delivery {outcome}");
            received()
        }
        Err(e) => match rejection(e.as_ref().kind()) {
            Some((status, code)) => {
                if status.is_server_error() {
                    log::error!("webhook delivery failed: {e}");
                } else {
                    log::warn!("webhook delivery rejected: {e}");
                }
                (status, Json(Rejected { error: code })).into_response()
            }
            None => {
                log::warn!("webhook delivery skipped: {e}");
                received()
            }
        },
    }
}

/// Builds the response of an accepted delivery.
fn received() -> Response {
    Json(Received { received: true }).into_response()
}

/// Returns the status and the code rejecting a delivery failed with the
/// provided [`Kind`], if it must be rejected.
fn rejection(kind: Kind) -> Option<(http::StatusCode, &'static str)> {
    match kind {
        Kind::SignatureInvalid => {
            Some((http::StatusCode::BAD_REQUEST, "SIGNATURE_INVALID"))
        }
        Kind::Internal => {
            Some((http::StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"))
        }
        Kind::NotFound
        | Kind::Forbidden
        | Kind::InvalidArgument
        | Kind::InvalidState
        | Kind::Unavailable
        | Kind::AlreadyPaid
        | Kind::NoEligibleReservations
        | Kind::ProviderError => None,
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::process_webhook::ExecutionError,
        domain::reservation,
        error::{Classify as _, Kind},
        infra::payment::{self, stripe::SignatureError},
    };

    use super::rejection;

    #[test]
    fn rejects_forged_signature() {
        let e = ExecutionError::Provider(payment::Error::Signature(
            SignatureError::Mismatch,
        ));

        assert_eq!(
            rejection(e.kind()).map(|(status, _)| status),
            Some(http::StatusCode::BAD_REQUEST),
        );
    }

    #[test]
    fn asks_redelivery_on_internal_failure() {
        assert_eq!(
            rejection(Kind::Internal).map(|(status, _)| status),
            Some(http::StatusCode::INTERNAL_SERVER_ERROR),
        );
    }

    #[test]
    fn acknowledges_unmatched_event() {
        let e = ExecutionError::ReservationNotExists(reservation::Id::new());

        assert!(rejection(e.kind()).is_none());
    }
}
