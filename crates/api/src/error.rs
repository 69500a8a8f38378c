use agency_core::access::AccessDenied;
use agency_core::auth::TokenError;
use agency_core::store::StoreError;
use agency_core::ManagerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error type that maps to JSON error envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error(transparent)]
    AccessDenied(AccessDenied),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Denied(denied) => ApiError::AccessDenied(denied),
            ManagerError::Lifecycle(e) => ApiError::Conflict(e.to_string()),
            ManagerError::Busy(_) => ApiError::Conflict(err.to_string()),
            ManagerError::Editor(e) => ApiError::Validation(e.to_string()),
            ManagerError::Section(e) => ApiError::Validation(e.to_string()),
            ManagerError::Invalid(msg) => ApiError::Validation(msg),
            ManagerError::NotFound { .. } | ManagerError::NotPublic(_) => {
                ApiError::NotFound(err.to_string())
            }
            ManagerError::SelfRoleChange => ApiError::Forbidden(err.to_string()),
            ManagerError::Store(e) => e.into(),
        }
    }
}

impl From<AccessDenied> for ApiError {
    fn from(denied: AccessDenied) -> Self {
        ApiError::AccessDenied(denied)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Database(e) => ApiError::Database(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(_: TokenError) -> Self {
        ApiError::Unauthorized("Invalid or expired session token")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validationError",
                msg.clone(),
            ),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.to_string())
            }
            ApiError::AccessDenied(denied) => {
                let body = json!({
                    "error": {
                        "type": "accessDenied",
                        "message": denied.to_string(),
                        "statusCode": StatusCode::FORBIDDEN.as_u16(),
                        "role": denied.role,
                        "operation": denied.operation,
                        "target": denied.target,
                    }
                });
                return (StatusCode::FORBIDDEN, Json(body)).into_response();
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Database(err) => {
                tracing::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
