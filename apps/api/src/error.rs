//! Error types for the REST API.
//!
//! Every failure leaves the server as
//! `{ "success": false, "error": <CODE>, "message": <text> }`.
//!
//! ## Status Mapping
//! ```text
//! ValidationError, InvalidStatusTransition,
//! DiscountNotApplicable, DiscountAlreadyUsed,
//! PackageInactive, malformed JSON               → 400
//! missing / invalid bearer token                → 401
//! PermissionDenied                              → 403
//! NotFound, PackageNotFound, DiscountNotFound   → 404
//! UniqueViolation                               → 409
//! storage / runtime failures                    → 500 (logged, generic text)
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use chairside_core::{CoreError, ValidationError};
use chairside_db::DbError;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code for the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::BadRequest { code, .. } | ApiError::NotFound { code, .. } => code,
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "PERMISSION_DENIED",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(_) => ApiError::Validation(message),
            CoreError::PackageNotFound(_) => ApiError::NotFound {
                code: "PACKAGE_NOT_FOUND",
                message,
            },
            CoreError::DiscountNotFound(_) => ApiError::NotFound {
                code: "DISCOUNT_NOT_FOUND",
                message,
            },
            CoreError::NotFound { .. } => ApiError::NotFound {
                code: "NOT_FOUND",
                message,
            },
            CoreError::PackageInactive(_) => ApiError::BadRequest {
                code: "PACKAGE_INACTIVE",
                message,
            },
            CoreError::DiscountNotApplicable { .. } => ApiError::BadRequest {
                code: "DISCOUNT_NOT_APPLICABLE",
                message,
            },
            CoreError::DiscountAlreadyUsed { .. } => ApiError::BadRequest {
                code: "DISCOUNT_ALREADY_USED",
                message,
            },
            CoreError::InvalidStatusTransition { .. } => ApiError::BadRequest {
                code: "INVALID_STATUS_TRANSITION",
                message,
            },
            CoreError::PermissionDenied(_) => ApiError::Forbidden(message),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { .. } => ApiError::NotFound {
                code: "NOT_FOUND",
                message: err.to_string(),
            },
            DbError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": self.code(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_status() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (
                CoreError::DiscountAlreadyUsed { code: "SAVE10".into() }.into(),
                StatusCode::BAD_REQUEST,
                "DISCOUNT_ALREADY_USED",
            ),
            (
                CoreError::PermissionDenied("delete appointments".into()).into(),
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
            ),
            (
                CoreError::not_found("Client", 9).into(),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                DbError::Domain(CoreError::PackageNotFound(3)).into(),
                StatusCode::NOT_FOUND,
                "PACKAGE_NOT_FOUND",
            ),
            (
                DbError::PoolExhausted.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.code(), code);
        }
    }
}
