//! GraphQL [`Query`]s definitions.

use common::{pagination, Date};
use juniper::graphql_object;
use service::{domain::reservation::Stay, query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Reservation` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the `Reservation` does not exist;
    /// - `FORBIDDEN` - the authenticated user is neither its guest nor its
    ///                 host.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "reservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reservation(
        id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::GetReservation {
                reservation_id: id.into(),
                actor_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Reservation`s of the authenticated user.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGINATION_ARGUMENTS` - `page` or `limit` is out of range.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "reservations",
            limit = ?limit,
            otel.name = Self::SPAN_NAME,
            page = ?page,
            role = ?role,
            status = ?status,
        ),
    )]
    pub async fn reservations(
        role: Option<api::reservation::list::Role>,
        status: Option<api::reservation::BookingStatus>,
        unit_id: Option<api::UnitId>,
        upcoming_from: Option<Date>,
        page: Option<i32>,
        limit: Option<i32>,
        ctx: &Context,
    ) -> Result<api::reservation::list::Page, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let arguments = api::pagination(page, limit).map_err(ctx.error())?;
        ctx.service()
            .execute(query::reservations::List::by(pagination::Selector {
                arguments,
                filter: read::reservation::list::Filter {
                    actor_id: my_id,
                    role: role.unwrap_or_default().into(),
                    booking_status: status.map(Into::into),
                    unit_id: unit_id.map(Into::into),
                    upcoming_from,
                },
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Invoice` of the specified `Reservation`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the `Reservation` does not exist;
    /// - `FORBIDDEN` - the authenticated user is neither its guest nor its
    ///                 host.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "invoice",
            otel.name = Self::SPAN_NAME,
            reservation_id = %reservation_id,
        ),
    )]
    pub async fn invoice(
        reservation_id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::reservation::Invoice, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::GetInvoice {
                reservation_id: reservation_id.into(),
                actor_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the payment state of the specified `Reservation`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_FOUND` - the `Reservation` does not exist;
    /// - `FORBIDDEN` - the authenticated user is neither its guest nor its
    ///                 host.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "paymentDetails",
            otel.name = Self::SPAN_NAME,
            reservation_id = %reservation_id,
        ),
    )]
    pub async fn payment_details(
        reservation_id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::reservation::PaymentDetails, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::GetPaymentDetails {
                reservation_id: reservation_id.into(),
                actor_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Indicates whether the specified unit is free for the whole stay.
    ///
    /// Doesn't require authentication.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_STAY` - `checkOut` is not after `checkIn`.
    #[tracing::instrument(
        skip_all,
        fields(
            check_in = %check_in,
            check_out = %check_out,
            gql.name = "isAvailable",
            otel.name = Self::SPAN_NAME,
            unit_id = %unit_id,
        ),
    )]
    pub async fn is_available(
        unit_id: api::UnitId,
        check_in: Date,
        check_out: Date,
        ctx: &Context,
    ) -> Result<bool, Error> {
        let stay = Stay::new(check_in, check_out)
            .ok_or_else(|| StayError::Invalid.into())
            .map_err(ctx.error())?;
        ctx.service()
            .execute(query::reservation::IsAvailable::by((
                unit_id.into(),
                stay,
            )))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|available| *available)
    }

    /// Fetches the page of `Payout`s of the authenticated host.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGINATION_ARGUMENTS` - `page` or `limit` is out of range.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "payouts",
            limit = ?limit,
            otel.name = Self::SPAN_NAME,
            page = ?page,
            status = ?status,
        ),
    )]
    pub async fn payouts(
        status: Option<api::payout::Status>,
        page: Option<i32>,
        limit: Option<i32>,
        ctx: &Context,
    ) -> Result<api::payout::list::Page, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let arguments = api::pagination(page, limit).map_err(ctx.error())?;
        ctx.service()
            .execute(query::payouts::List::by(pagination::Selector {
                arguments,
                filter: read::payout::list::Filter {
                    host_id: my_id,
                    status: status.map(Into::into),
                },
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum StayError {
        #[code = "INVALID_STAY"]
        #[status = BAD_REQUEST]
        #[message = "Check-out date must be after check-in date"]
        Invalid,
    }
}
