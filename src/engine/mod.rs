//! Business rules: attendance, leave, dashboards, org configuration, messaging.
//!
//! Every operation takes the pool (and, where time matters, the current
//! wall-clock instant) explicitly so the rules can be exercised directly.

pub mod accounts;
pub mod attendance;
pub mod dashboard;
pub mod leave;
pub mod messaging;
pub mod org;

use thiserror::Error;

/// Failures raised by domain operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("You have already checked in today")]
    AlreadyCheckedIn,

    #[error("Today is not a working day ({0})")]
    NonWorkingDay(String),

    #[error("You have not checked in today")]
    NoCheckIn,

    #[error("You have already checked out today")]
    AlreadyCheckedOut,

    #[error("A correction request is already pending for this attendance record")]
    DuplicatePendingCorrection,

    #[error("This correction request has already been reviewed")]
    AlreadyReviewed,

    #[error("End date must be on or after start date")]
    InvalidRange,

    #[error("Insufficient leave balance: requested {requested} day(s), {available} available")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("Only HR admins can perform this action")]
    NotAuthorized,

    #[error("This leave request has already been processed")]
    AlreadyProcessed,

    #[error("{0}")]
    ConflictingDayType(String),

    #[error("{0} is protected and cannot be deleted")]
    ProtectedResource(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Failed to hash password: {0}")]
    PasswordHash(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// True when a database error is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
