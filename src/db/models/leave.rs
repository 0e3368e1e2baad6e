//! Leave requests and per-year leave balances.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveType {
    #[serde(rename = "Sick Leave")]
    SickLeave,
    #[serde(rename = "Vacation")]
    Vacation,
    #[serde(rename = "Personal Leave")]
    PersonalLeave,
    #[serde(rename = "Other")]
    Other,
}

impl LeaveType {
    /// The balance bucket this type draws from. `Other` is not tracked.
    pub fn bucket(&self) -> Option<BalanceBucket> {
        match self {
            LeaveType::SickLeave => Some(BalanceBucket::SickLeave),
            LeaveType::Vacation => Some(BalanceBucket::Vacation),
            LeaveType::PersonalLeave => Some(BalanceBucket::PersonalLeave),
            LeaveType::Other => None,
        }
    }
}

impl std::fmt::Display for LeaveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaveType::SickLeave => write!(f, "Sick Leave"),
            LeaveType::Vacation => write!(f, "Vacation"),
            LeaveType::PersonalLeave => write!(f, "Personal Leave"),
            LeaveType::Other => write!(f, "Other"),
        }
    }
}

impl std::str::FromStr for LeaveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sick leave" | "sick" => Ok(LeaveType::SickLeave),
            "vacation" => Ok(LeaveType::Vacation),
            "personal leave" | "personal" => Ok(LeaveType::PersonalLeave),
            "other" => Ok(LeaveType::Other),
            _ => Err(format!("Unknown leave type: {}", s)),
        }
    }
}

impl From<String> for LeaveType {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(LeaveType::Other)
    }
}

/// Tracked leave allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceBucket {
    SickLeave,
    Vacation,
    PersonalLeave,
}

impl BalanceBucket {
    pub fn used_column(&self) -> &'static str {
        match self {
            BalanceBucket::SickLeave => "sick_leave_used",
            BalanceBucket::Vacation => "vacation_used",
            BalanceBucket::PersonalLeave => "personal_leave_used",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaveStatus::Pending => write!(f, "pending"),
            LeaveStatus::Approved => write!(f, "approved"),
            LeaveStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for LeaveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(LeaveStatus::Pending),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            _ => Err(format!("Unknown leave status: {}", s)),
        }
    }
}

impl From<String> for LeaveStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(LeaveStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Leave {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub reason: String,
    pub status: String,
    pub approved_by: Option<String>,
    pub approval_date: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: String,
}

impl Leave {
    pub fn type_enum(&self) -> LeaveType {
        LeaveType::from(self.leave_type.clone())
    }

    pub fn status_enum(&self) -> LeaveStatus {
        LeaveStatus::from(self.status.clone())
    }

    pub async fn find_by_id(db: &SqlitePool, id: &str) -> Result<Option<Leave>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM leaves WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Approved leaves covering `date`
    pub async fn list_active_on(db: &SqlitePool, date: NaiveDate) -> Result<Vec<Leave>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM leaves WHERE status = 'approved' AND start_date <= ? AND end_date >= ?",
        )
        .bind(date)
        .bind(date)
        .fetch_all(db)
        .await
    }
}

/// Leave joined with the requester, for admin lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaveWithUser {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub reason: String,
    pub status: String,
    pub approved_by: Option<String>,
    pub approval_date: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub full_name: String,
    pub employee_id: String,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveQuery {
    pub status: Option<LeaveStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveRequest {
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectLeaveRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LeaveBalance {
    pub id: String,
    pub user_id: String,
    pub year: i32,
    pub sick_leave_used: i64,
    pub sick_leave_total: i64,
    pub vacation_used: i64,
    pub vacation_total: i64,
    pub personal_leave_used: i64,
    pub personal_leave_total: i64,
}

impl LeaveBalance {
    pub fn bucket(&self, bucket: BalanceBucket) -> BucketBalance {
        match bucket {
            BalanceBucket::SickLeave => BucketBalance {
                used: self.sick_leave_used,
                total: self.sick_leave_total,
            },
            BalanceBucket::Vacation => BucketBalance {
                used: self.vacation_used,
                total: self.vacation_total,
            },
            BalanceBucket::PersonalLeave => BucketBalance {
                used: self.personal_leave_used,
                total: self.personal_leave_total,
            },
        }
    }

    pub async fn find(
        db: &SqlitePool,
        user_id: &str,
        year: i32,
    ) -> Result<Option<LeaveBalance>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM leave_balances WHERE user_id = ? AND year = ?")
            .bind(user_id)
            .bind(year)
            .fetch_optional(db)
            .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketBalance {
    pub used: i64,
    pub total: i64,
}

impl BucketBalance {
    pub fn remaining(&self) -> i64 {
        (self.total - self.used).max(0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalanceResponse {
    pub year: i32,
    pub sick_leave: BucketBalance,
    pub vacation: BucketBalance,
    pub personal_leave: BucketBalance,
}

impl From<LeaveBalance> for LeaveBalanceResponse {
    fn from(balance: LeaveBalance) -> Self {
        Self {
            year: balance.year,
            sick_leave: balance.bucket(BalanceBucket::SickLeave),
            vacation: balance.bucket(BalanceBucket::Vacation),
            personal_leave: balance.bucket(BalanceBucket::PersonalLeave),
        }
    }
}
