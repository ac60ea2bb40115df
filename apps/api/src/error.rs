//! # API Error Types
//!
//! Every failure leaves the API as `{ "code": "...", "message": "..." }` with
//! a matching status.
//!
//! ## Mapping
//! ```text
//! ValidationError, InsufficientStock,
//! duplicates, still referenced          → 400
//! missing / bad token, unknown user     → 401
//! role denied, admin deleting self      → 403
//! NotFound, ProductNotFound             → 404
//! ConcurrencyConflict, Busy             → 503
//! everything else                       → 500 (details logged, not returned)
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use stockroom_core::{AccessDenied, CoreError, ValidationError};
use stockroom_db::{DbError, SaleError};

const GENERIC_INTERNAL: &str = "Internal server error";

/// Error returned by every handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Logs `detail` and returns a body that does not contain it.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", GENERIC_INTERNAL)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request("VALIDATION_ERROR", err.to_string())
    }
}

impl From<AccessDenied> for ApiError {
    fn from(err: AccessDenied) -> Self {
        let allowed: Vec<&str> = err.allowed().iter().map(|r| r.as_str()).collect();
        ApiError::forbidden(format!("{err}. Required role: {}", allowed.join(" or ")))
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::ProductNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND", err.to_string())
            }
            CoreError::InsufficientStock { .. } => {
                ApiError::bad_request("INSUFFICIENT_STOCK", err.to_string())
            }
            CoreError::AmountOverflow { .. } => {
                ApiError::bad_request("VALIDATION_ERROR", err.to_string())
            }
            CoreError::PasswordHash(e) => ApiError::internal(e),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::NotFound { entity, .. } => ApiError::not_found(format!("{entity} not found")),
            DbError::UniqueViolation { .. } => ApiError::bad_request("DUPLICATE", err.to_string()),
            DbError::StillReferenced { .. } => {
                ApiError::bad_request("STILL_REFERENCED", err.to_string())
            }
            DbError::ForeignKeyViolation { .. } => ApiError::bad_request(
                "REFERENCE_VIOLATION",
                "The request references a record that does not exist or is still in use",
            ),
            DbError::NegativeStock { .. } => {
                ApiError::bad_request("INSUFFICIENT_STOCK", err.to_string())
            }
            DbError::StockOutOfRange { .. } => {
                ApiError::bad_request("VALIDATION_ERROR", err.to_string())
            }
            DbError::ConstraintViolation(_) => {
                ApiError::bad_request("CONSTRAINT_VIOLATION", err.to_string())
            }
            DbError::Busy(_) | DbError::PoolExhausted => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "CONCURRENCY_CONFLICT",
                "The server is busy, please retry",
            ),
            _ => ApiError::internal(err),
        }
    }
}

impl From<SaleError> for ApiError {
    fn from(err: SaleError) -> Self {
        match err {
            SaleError::Validation(e) => e.into(),
            SaleError::ProductNotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND", err.to_string())
            }
            SaleError::InsufficientStock { .. } => {
                ApiError::bad_request("INSUFFICIENT_STOCK", err.to_string())
            }
            SaleError::ConcurrencyConflict { .. } => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "CONCURRENCY_CONFLICT",
                err.to_string(),
            ),
            SaleError::PersistenceFailure(ref cause) => {
                error!(error = %cause, "Sale persistence failure");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_FAILURE",
                    err.to_string(),
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("INVALID_BODY", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request("INVALID_QUERY", rejection.body_text())
    }
}
