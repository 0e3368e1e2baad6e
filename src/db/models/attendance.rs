//! Attendance records and correction requests.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

// Open-ended range bounds. Dates compare as ISO text, so stay within 4-digit years.
pub(crate) fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub(crate) fn latest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Leave,
}

impl AttendanceStatus {
    /// Absent and leave days carry no clock times
    pub fn clears_times(&self) -> bool {
        matches!(self, AttendanceStatus::Absent | AttendanceStatus::Leave)
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Late => write!(f, "late"),
            Self::Absent => write!(f, "absent"),
            Self::Leave => write!(f, "leave"),
        }
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "late" => Ok(Self::Late),
            "absent" => Ok(Self::Absent),
            "leave" => Ok(Self::Leave),
            _ => Err(format!("Unknown attendance status: {}", s)),
        }
    }
}

impl From<String> for AttendanceStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Absent)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub hours: f64,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Attendance {
    pub fn status_enum(&self) -> AttendanceStatus {
        AttendanceStatus::from(self.status.clone())
    }

    /// Notes are private to the record owner
    pub fn without_notes(mut self) -> Self {
        self.notes = None;
        self
    }

    pub async fn find_by_id(db: &SqlitePool, id: &str) -> Result<Option<Attendance>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM attendance WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_for_day(
        db: &SqlitePool,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM attendance WHERE user_id = ? AND date = ?")
            .bind(user_id)
            .bind(date)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: &str,
        query: &AttendanceQuery,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let limit = query.limit.unwrap_or(100).clamp(1, 500);
        let offset = query.offset.unwrap_or(0).max(0);
        let from = query.from.unwrap_or_else(earliest_date);
        let to = query.to.unwrap_or_else(latest_date);

        sqlx::query_as(
            r#"
            SELECT * FROM attendance
            WHERE user_id = ? AND date >= ? AND date <= ?
            ORDER BY date DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// Every record with `from <= date <= to`, all users
    pub async fn list_between(
        db: &SqlitePool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM attendance WHERE date >= ? AND date <= ? ORDER BY date ASC")
            .bind(from)
            .bind(to)
            .fetch_all(db)
            .await
    }

    pub async fn list_between_for_user(
        db: &SqlitePool,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM attendance WHERE user_id = ? AND date >= ? AND date <= ? ORDER BY date ASC",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(db)
        .await
    }
}

/// Attendance row joined with its owner, for admin views
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceWithUser {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub hours: f64,
    pub status: String,
    pub full_name: String,
    pub employee_id: String,
    pub department: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Admin override of an attendance record.
///
/// `check_in` / `check_out` accept a full `YYYY-MM-DDTHH:MM[:SS]` timestamp
/// or a bare `HH:MM` resolved against the record's date.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEdit {
    pub status: Option<AttendanceStatus>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub date: Option<NaiveDate>,
}

impl AttendanceEdit {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.check_in.is_none()
            && self.check_out.is_none()
            && self.date.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAttendanceRequest {
    pub user_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for CorrectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for CorrectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown correction status: {}", s)),
        }
    }
}

impl From<String> for CorrectionStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceCorrection {
    pub id: String,
    pub attendance_id: String,
    pub user_id: String,
    pub reason: String,
    pub requested_status: Option<String>,
    pub requested_check_in: Option<String>,
    pub requested_check_out: Option<String>,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub review_notes: Option<String>,
    pub created_at: String,
}

impl AttendanceCorrection {
    pub fn status_enum(&self) -> CorrectionStatus {
        CorrectionStatus::from(self.status.clone())
    }

    pub async fn find_by_id(
        db: &SqlitePool,
        id: &str,
    ) -> Result<Option<AttendanceCorrection>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM attendance_corrections WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<AttendanceCorrection>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM attendance_corrections WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }
}

/// Correction joined with the requester and the record it targets
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionWithDetails {
    pub id: String,
    pub attendance_id: String,
    pub user_id: String,
    pub reason: String,
    pub requested_status: Option<String>,
    pub requested_check_in: Option<String>,
    pub requested_check_out: Option<String>,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub review_notes: Option<String>,
    pub created_at: String,
    pub full_name: String,
    pub employee_id: String,
    pub attendance_date: NaiveDate,
    pub attendance_status: String,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
}

impl CorrectionWithDetails {
    /// All corrections regardless of status, newest first
    pub async fn list_all(db: &SqlitePool) -> Result<Vec<CorrectionWithDetails>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT c.*, u.full_name, u.employee_id,
                   a.date AS attendance_date, a.status AS attendance_status,
                   a.check_in, a.check_out
            FROM attendance_corrections c
            JOIN users u ON u.id = c.user_id
            JOIN attendance a ON a.id = c.attendance_id
            ORDER BY c.created_at DESC
            "#,
        )
        .fetch_all(db)
        .await
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    pub reason: String,
    pub requested_status: Option<AttendanceStatus>,
    pub requested_check_in: Option<String>,
    pub requested_check_out: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCorrectionRequest {
    pub status: CorrectionStatus,
    pub review_notes: Option<String>,
    /// Amendments applied to the attendance record when approving
    #[serde(default)]
    pub amend: AttendanceEdit,
}
