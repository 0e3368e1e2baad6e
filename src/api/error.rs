//! Unified API error handling.
//!
//! Every failure leaves the server as `{"message": ..., "code": ...}` with a
//! conventional status code; field-level validation problems add `details`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::EngineError;

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Client errors (4xx)
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ValidationError,

    // Domain rule violations (400)
    AlreadyCheckedIn,
    NonWorkingDay,
    NoCheckIn,
    AlreadyCheckedOut,
    DuplicatePendingCorrection,
    AlreadyReviewed,
    InvalidRange,
    InsufficientBalance,
    AlreadyProcessed,
    ConflictingDayType,
    ProtectedResource,

    // Server errors (5xx)
    InternalError,
}

impl ErrorCode {
    /// Get the default HTTP status code for this error code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::AlreadyCheckedIn => "already_checked_in",
            ErrorCode::NonWorkingDay => "non_working_day",
            ErrorCode::NoCheckIn => "no_check_in",
            ErrorCode::AlreadyCheckedOut => "already_checked_out",
            ErrorCode::DuplicatePendingCorrection => "duplicate_pending_correction",
            ErrorCode::AlreadyReviewed => "already_reviewed",
            ErrorCode::InvalidRange => "invalid_range",
            ErrorCode::InsufficientBalance => "insufficient_balance",
            ErrorCode::AlreadyProcessed => "already_processed",
            ErrorCode::ConflictingDayType => "conflicting_day_type",
            ErrorCode::ProtectedResource => "protected_resource",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// Response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message, shown to users verbatim
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    status: StatusCode,
    message: String,
    details: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: code.status_code(),
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Bad request error (400)
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Unauthorized error (401) - authentication required
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Forbidden error (403) - authenticated but not allowed
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Validation error (400) with field-level details
    pub fn validation(errors: HashMap<String, Vec<String>>) -> Self {
        let message = if errors.len() == 1 {
            errors
                .values()
                .next()
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_else(|| "Validation failed".to_string())
        } else {
            format!("Validation failed for {} fields", errors.len())
        };

        Self {
            details: Some(errors),
            ..Self::new(ErrorCode::ValidationError, message)
        }
    }

    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::validation(errors)
    }

    /// Internal server error (500). The cause is logged, never sent.
    pub fn internal() -> Self {
        Self::new(ErrorCode::InternalError, "Server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message,
            code: self.code.as_str().to_string(),
            details: self.details,
        };

        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE constraint failed") => {
                ApiError::new(
                    ErrorCode::Conflict,
                    "A record with this identifier already exists",
                )
            }
            _ => {
                tracing::error!("Database error: {}", err);
                ApiError::internal()
            }
        }
    }
}

/// Malformed bodies, queries and path segments are validation failures
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorCode::ValidationError, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(ErrorCode::ValidationError, rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::new(ErrorCode::ValidationError, rejection.body_text())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Database(db_err) => return ApiError::from(db_err),
            EngineError::PasswordHash(cause) => {
                tracing::error!("Password hashing failed: {}", cause);
                return ApiError::internal();
            }
            _ => {}
        }

        let code = match &err {
            EngineError::InvalidCredentials => ErrorCode::Unauthorized,
            EngineError::AlreadyCheckedIn => ErrorCode::AlreadyCheckedIn,
            EngineError::NonWorkingDay(_) => ErrorCode::NonWorkingDay,
            EngineError::NoCheckIn => ErrorCode::NoCheckIn,
            EngineError::AlreadyCheckedOut => ErrorCode::AlreadyCheckedOut,
            EngineError::DuplicatePendingCorrection => ErrorCode::DuplicatePendingCorrection,
            EngineError::AlreadyReviewed => ErrorCode::AlreadyReviewed,
            EngineError::InvalidRange => ErrorCode::InvalidRange,
            EngineError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            EngineError::NotAuthorized | EngineError::Forbidden(_) => ErrorCode::Forbidden,
            EngineError::AlreadyProcessed => ErrorCode::AlreadyProcessed,
            EngineError::ConflictingDayType(_) => ErrorCode::ConflictingDayType,
            EngineError::ProtectedResource(_) => ErrorCode::ProtectedResource,
            EngineError::NotFound(_) => ErrorCode::NotFound,
            EngineError::Validation(_) => ErrorCode::ValidationError,
            EngineError::Conflict(_) => ErrorCode::Conflict,
            EngineError::Database(_) | EngineError::PasswordHash(_) => ErrorCode::InternalError,
        };
        ApiError::new(code, err.to_string())
    }
}

/// Builder for collecting multiple validation errors
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: HashMap<String, Vec<String>>,
}

impl ValidationErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the error from a `Result<(), String>` validator, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Return Ok(()) if no errors, or Err(ApiError) if there are errors
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}
