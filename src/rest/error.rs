//! API error types and responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::StoreError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found
    NotFound(String),
    /// Bad request
    BadRequest(String),
    /// Booking request could not be parsed into a workflow
    ParseFailure(String),
    /// Upstream store unreachable
    Unavailable(String),
    /// Internal server error
    InternalError(String),
}

/// Error response body
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::ParseFailure(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "parse_failure", msg)
            }
            ApiError::Unavailable(msg) => (StatusCode::BAD_GATEWAY, "store_unavailable", msg),
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("Workflow '{id}' not found")),
            StoreError::ParseFailure(msg) => ApiError::ParseFailure(msg),
            StoreError::Unavailable(msg) => ApiError::Unavailable(msg),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("JSON error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_not_found_response() {
        let error = ApiError::NotFound("Workflow 'w1' not found".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.error, "not_found");
    }

    #[tokio::test]
    async fn test_parse_failure_response() {
        let error = ApiError::ParseFailure("empty booking request".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_store_error_mapping() {
        let error: ApiError = StoreError::Unavailable("connection refused".to_string()).into();
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
