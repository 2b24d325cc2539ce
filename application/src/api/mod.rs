//! GraphQL API definitions.

mod mutation;
pub mod payment;
pub mod payout;
mod query;
pub mod reservation;

use derive_more::{Display, From, Into};
use juniper::{EmptySubscription, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{define_error, Context};

pub use self::{
    mutation::Mutation, payout::Payout, query::Query,
    reservation::Reservation,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

/// Creates a new [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}

/// Unique identifier of a platform user.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::user::Id)]
#[into(domain::user::Id)]
#[graphql(name = "UserId", transparent)]
pub struct UserId(Uuid);

/// Unique identifier of a rentable unit.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::unit::Id)]
#[into(domain::unit::Id)]
#[graphql(name = "UnitId", transparent)]
pub struct UnitId(Uuid);

define_error! {
    enum PaginationError {
        #[code = "INVALID_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "Page must be positive and limit must be within 1..=100"]
        Invalid,
    }
}

/// Default number of items on a page.
const DEFAULT_PAGE_SIZE: usize = 20;

/// Parses the provided pagination arguments.
///
/// # Errors
///
/// With [`PaginationError::Invalid`] if the arguments are out of range.
fn pagination(
    page: Option<i32>,
    limit: Option<i32>,
) -> Result<common::pagination::Arguments, crate::Error> {
    common::pagination::Arguments::new(page, limit, DEFAULT_PAGE_SIZE)
        .ok_or_else(|| PaginationError::Invalid.into())
}

#[cfg(test)]
mod spec {
    use super::schema;

    #[test]
    fn leaves_completion_to_background_task() {
        let schema = schema();
        let mutation = schema
            .schema
            .concrete_type_by_name("Mutation")
            .expect("`Mutation` type exists");

        assert!(mutation.field_by_name("acceptReservation").is_some());
        assert!(mutation.field_by_name("cancelReservation").is_some());
        assert!(mutation.field_by_name("completeReservation").is_none());
    }
}
