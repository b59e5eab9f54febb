/// Unified error types for Quillboard
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Role hierarchy or ownership check failed
    #[error("{0}")]
    Forbidden(String),

    /// Validation errors (missing/oversized fields, unknown role names)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("{0}")]
    NotFound(String),

    /// Ban on a banned entity, unban on an active one
    #[error("{0}")]
    AlreadyInState(String),

    /// Request is well-formed but not acceptable (self-subscription)
    #[error("{0}")]
    BadRequest(String),

    /// Conflict errors (duplicate profile, subscription, like, email)
    #[error("{0}")]
    Conflict(String),

    /// A role string outside the fixed hierarchy reached the evaluator
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiError {
    /// HTTP status and stable error code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Authentication(_) | ApiError::Jwt(_) => {
                (StatusCode::UNAUTHORIZED, "AuthenticationRequired")
            }
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "InvalidRequest"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::AlreadyInState(_) => (StatusCode::BAD_REQUEST, "AlreadyInState"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            ApiError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RateLimitExceeded")
            }
            ApiError::Database(_)
            | ApiError::Internal(_)
            | ApiError::Io(_)
            | ApiError::InvalidRole(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
        }
    }
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError::AlreadyInState("User is already banned.".into()).status_and_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Forbidden("nope".into()).status_and_code().0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Validation("reason".into()).status_and_code().0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status_and_code().0,
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_invalid_role_is_internal() {
        let (status, code) = ApiError::InvalidRole("owner".into()).status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "InternalServerError");
    }
}
