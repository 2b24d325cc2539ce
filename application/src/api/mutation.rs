//! GraphQL [`Mutation`]s definitions.

use common::{Date, Money};
use juniper::graphql_object;
use service::{command, Command as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Reserves the specified unit for the authenticated guest.
    ///
    /// The created `Reservation` is `PENDING` until its host accepts it or
    /// it's paid.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the unit does not exist or is not active;
    /// - `FORBIDDEN` - the authenticated user hosts the unit;
    /// - `INVALID_ARGUMENT` - the dates or the guest count are not allowed by
    ///                        the unit;
    /// - `UNAVAILABLE` - the stay overlaps another `Reservation`.
    #[tracing::instrument(
        skip_all,
        fields(
            check_in = %check_in,
            check_out = %check_out,
            gql.name = "createReservation",
            guest_count = guest_count,
            otel.name = Self::SPAN_NAME,
            unit_id = %unit_id,
        ),
    )]
    pub async fn create_reservation(
        unit_id: api::UnitId,
        check_in: Date,
        check_out: Date,
        guest_count: i32,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::CreateReservation {
                guest_id: my_id,
                unit_id: unit_id.into(),
                check_in,
                check_out,
                guest_count: u16::try_from(guest_count.max(0))
                    .unwrap_or(u16::MAX),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Accepts the specified `PENDING` `Reservation` on behalf of its host.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the `Reservation` does not exist;
    /// - `FORBIDDEN` - the authenticated user is not its host;
    /// - `INVALID_STATE` - the `Reservation` is not `PENDING`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "acceptReservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn accept_reservation(
        id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::AcceptReservation {
                reservation_id: id.into(),
                host_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Declines the specified `PENDING` `Reservation` on behalf of its host.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the `Reservation` does not exist;
    /// - `FORBIDDEN` - the authenticated user is not its host;
    /// - `INVALID_ARGUMENT` - the `reason` is blank or too long;
    /// - `INVALID_STATE` - the `Reservation` is not `PENDING`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "declineReservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn decline_reservation(
        id: api::reservation::Id,
        reason: String,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::DeclineReservation {
                reservation_id: id.into(),
                host_id: my_id,
                reason,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels the specified `PENDING` or `CONFIRMED` `Reservation` on behalf
    /// of its guest or host.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the `Reservation` does not exist;
    /// - `FORBIDDEN` - the authenticated user is neither its guest nor its
    ///                 host;
    /// - `INVALID_ARGUMENT` - the `reason` is blank or too long;
    /// - `INVALID_STATE` - the `Reservation` is cancelled or completed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelReservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_reservation(
        id: api::reservation::Id,
        reason: String,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::CancelReservation {
                reservation_id: id.into(),
                actor_id: my_id,
                reason,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a `PaymentIntent` collecting the total of the specified
    /// `Reservation` from the authenticated guest.
    ///
    /// A live `PaymentIntent` created before is returned instead of a new
    /// one.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the `Reservation` does not exist;
    /// - `FORBIDDEN` - the authenticated user is not its guest;
    /// - `INVALID_STATE` - the `Reservation` is cancelled or completed;
    /// - `ALREADY_PAID` - the `Reservation` is paid already;
    /// - `PROVIDER_ERROR` - the payment provider has failed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createPaymentIntent",
            method = ?method,
            otel.name = Self::SPAN_NAME,
            reservation_id = %reservation_id,
        ),
    )]
    pub async fn create_payment_intent(
        reservation_id: api::reservation::Id,
        method: Option<api::payment::Method>,
        ctx: &Context,
    ) -> Result<api::payment::Intent, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::CreatePaymentIntent {
                reservation_id: reservation_id.into(),
                guest_id: my_id,
                method: method.unwrap_or_default().into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Confirms the payment of the specified `Reservation` with the state
    /// the payment provider reports for the `PaymentIntent`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the `Reservation` does not exist;
    /// - `FORBIDDEN` - the authenticated user is not its guest;
    /// - `INVALID_ARGUMENT` - the `PaymentIntent` doesn't pay the
    ///                        `Reservation`;
    /// - `INVALID_STATE` - the `Reservation` cannot be paid anymore;
    /// - `PROVIDER_ERROR` - the payment provider has failed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "confirmPayment",
            intent_id = %intent_id,
            otel.name = Self::SPAN_NAME,
            reservation_id = %reservation_id,
        ),
    )]
    pub async fn confirm_payment(
        reservation_id: api::reservation::Id,
        intent_id: api::payment::IntentId,
        ctx: &Context,
    ) -> Result<api::reservation::PaymentDetails, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::ConfirmPayment {
                reservation_id: reservation_id.into(),
                guest_id: my_id,
                intent_id: intent_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Refunds the payment of the specified `Reservation` on behalf of its
    /// host, fully if no `amount` is provided.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the `Reservation` does not exist;
    /// - `FORBIDDEN` - the authenticated user is not its host;
    /// - `INVALID_ARGUMENT` - the `amount` is not positive or exceeds the
    ///                        total;
    /// - `INVALID_STATE` - the `Reservation` is not paid;
    /// - `PROVIDER_ERROR` - the payment provider has failed.
    #[tracing::instrument(
        skip_all,
        fields(
            amount = ?amount,
            gql.name = "refundPayment",
            otel.name = Self::SPAN_NAME,
            reservation_id = %reservation_id,
        ),
    )]
    pub async fn refund_payment(
        reservation_id: api::reservation::Id,
        amount: Option<Money>,
        reason: Option<String>,
        ctx: &Context,
    ) -> Result<api::payment::Refund, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::RefundPayment {
                reservation_id: reservation_id.into(),
                host_id: my_id,
                amount,
                reason,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Pays the authenticated host out for their completed and fully paid
    /// `Reservation`s, narrowed to the specified ones if any.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NO_ELIGIBLE_RESERVATIONS` - there is nothing to pay out.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "requestPayout",
            otel.name = Self::SPAN_NAME,
            reservation_ids = ?reservation_ids,
        ),
    )]
    pub async fn request_payout(
        reservation_ids: Option<Vec<api::reservation::Id>>,
        ctx: &Context,
    ) -> Result<api::payout::Batch, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::RequestPayout {
                host_id: my_id,
                reservation_ids: reservation_ids
                    .map(|ids| ids.into_iter().map(Into::into).collect()),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}
