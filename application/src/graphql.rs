//! GraphQL endpoint.

use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response as HttpResponse},
    Extension, Json,
};
use derive_more::Debug;
use juniper::{http::GraphQLBatchResponse, DefaultScalarValue, ScalarValue};
use juniper_axum::extract::JuniperRequest;

use crate::{api, Context};

/// [`juniper`] GraphQL response carrying the status code of its first
/// failure.
#[derive(Debug)]
pub struct Response<S = DefaultScalarValue>
where
    S: ScalarValue,
{
    /// Status code of the response, used only if it fails.
    pub status_code: http::StatusCode,

    /// Underlying GraphQL response.
    #[debug(skip)]
    pub response: GraphQLBatchResponse<S>,
}

impl<S> IntoResponse for Response<S>
where
    S: ScalarValue,
{
    fn into_response(self) -> HttpResponse {
        let status = if self.response.is_ok() {
            http::StatusCode::OK
        } else {
            self.status_code
        };
        (status, Json(self.response)).into_response()
    }
}

/// GraphQL API handler.
pub async fn handler(
    Extension(schema): Extension<Arc<api::Schema>>,
    context: Context,
    JuniperRequest(request): JuniperRequest,
) -> Response {
    let response = request.execute(&*schema, &context).await;
    Response {
        status_code: context.error_status_code(),
        response,
    }
}

#[cfg(test)]
mod spec {
    use axum::response::IntoResponse as _;
    use juniper::{
        http::{GraphQLBatchResponse, GraphQLResponse},
        FieldError, Value,
    };

    use super::Response;

    #[test]
    fn succeeds_with_ok_status() {
        let resp: Response = Response {
            status_code: http::StatusCode::NOT_FOUND,
            response: GraphQLBatchResponse::Single(GraphQLResponse::from_result(
                Ok((Value::null(), vec![])),
            )),
        };

        assert_eq!(resp.into_response().status(), http::StatusCode::OK);
    }

    #[test]
    fn fails_with_recorded_status() {
        let resp: Response = Response {
            status_code: http::StatusCode::NOT_FOUND,
            response: GraphQLBatchResponse::Single(GraphQLResponse::error(
                FieldError::from("missing"),
            )),
        };

        assert_eq!(
            resp.into_response().status(),
            http::StatusCode::NOT_FOUND,
        );
    }
}
