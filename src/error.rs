//! Error types for the HTTP service
//!
//! Maps cache misses, bad requests and constraint failures onto HTTP
//! responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::constraints::ConstraintError;

// == Api Error Enum ==
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key absent, expired or reclaimed
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rule list could not be built
    #[error("Invalid constraint rules: {0}")]
    Constraint(#[from] ConstraintError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) | ApiError::Constraint(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (ApiError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::Constraint(ConstraintError::UnknownInclude { name: "x".into() }),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_error_message() {
        let error = ApiError::NotFound("session".to_string());
        assert_eq!(error.to_string(), "Key not found: session");
    }
}
