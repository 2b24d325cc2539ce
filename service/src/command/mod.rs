//! [`Command`] definition.

pub mod accept_reservation;
pub mod authorize_session;
pub mod cancel_reservation;
pub mod complete_reservation;
pub mod confirm_payment;
pub mod create_payment_intent;
pub mod create_reservation;
pub mod decline_reservation;
pub mod process_webhook;
pub mod refund_payment;
pub mod request_payout;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    accept_reservation::AcceptReservation,
    authorize_session::AuthorizeSession,
    cancel_reservation::CancelReservation,
    complete_reservation::CompleteReservation,
    confirm_payment::ConfirmPayment,
    create_payment_intent::CreatePaymentIntent,
    create_reservation::CreateReservation,
    decline_reservation::DeclineReservation, process_webhook::ProcessWebhook,
    refund_payment::RefundPayment, request_payout::RequestPayout,
};
