//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use creditdesk_client::AuthError;
use creditdesk_dispatcher::DispatchError;

use crate::repository::DirectoryError;
use crate::service::ServiceError;
use crate::service::organization_service::RegistrationError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// Logged in full, answered with a generic message
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential | AuthError::InvalidCredential => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::Rejected(msg) => ApiError::Forbidden(msg),
            AuthError::Unavailable(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            DirectoryError::Conflict(_) => ApiError::Conflict(err.to_string()),
            DirectoryError::Backend(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidSpec(msg) => ApiError::BadRequest(msg),
            DispatchError::NotFound(id) => ApiError::NotFound(format!("Job {} not found", id)),
            DispatchError::InvalidState { .. } | DispatchError::AlreadyPolling(_) => {
                ApiError::Conflict(err.to_string())
            }
            DispatchError::Store(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ServiceError::Forbidden(msg) => ApiError::Forbidden(msg),
            ServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ServiceError::Dispatch(e) => e.into(),
            ServiceError::Directory(e) => e.into(),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Invalid(msg) => ApiError::BadRequest(msg),
            RegistrationError::User(AuthError::Rejected(ref msg)) => {
                ApiError::BadRequest(format!("Failed to create user: {}", msg))
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
