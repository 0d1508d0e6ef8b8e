//! API error type and its HTTP mapping.
//!
//! Every error body is `{ "detail": "<message>" }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use prodops_core::{AuthError, CapabilityError, ValidationError};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    RateLimited,
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> &str {
        match self {
            ApiError::BadRequest(d)
            | ApiError::Unauthorized(d)
            | ApiError::Forbidden(d)
            | ApiError::NotFound(d)
            | ApiError::Internal(d) => d,
            ApiError::RateLimited => "Rate limit exceeded. Please slow down.",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Forbidden { .. } => ApiError::Forbidden(e.to_string()),
            AuthError::MissingToken | AuthError::Expired => ApiError::Unauthorized(e.to_string()),
            AuthError::InvalidToken(_) => {
                ApiError::Unauthorized("Invalid or expired token".into())
            }
            AuthError::UnknownUser(_) => ApiError::Unauthorized("User not found".into()),
        }
    }
}

impl From<CapabilityError> for ApiError {
    fn from(e: CapabilityError) -> Self {
        // Details stay in the log
        error!(capability = e.capability(), error = %e, "Capability failed");
        ApiError::Internal("Internal server error".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(ValidationError::EmptyMessage).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuthError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Forbidden {
                required: vec!["SUPERVISOR".into()]
            })
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(CapabilityError::failed("ticket_writer", "db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(CapabilityError::failed("ticket_writer", "password=hunter2"));
        assert!(!err.detail().contains("hunter2"));
    }
}
