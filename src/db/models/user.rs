//! User accounts and the closed set of authorization roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Authorization role carried by every account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Employee,
    HrAdmin,
    Admin,
}

impl UserRole {
    /// HR admins and admins share every privileged capability
    pub fn is_privileged(&self) -> bool {
        matches!(self, UserRole::HrAdmin | UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Employee => write!(f, "employee"),
            UserRole::HrAdmin => write!(f, "hr_admin"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "employee" => Ok(UserRole::Employee),
            "hr_admin" => Ok(UserRole::HrAdmin),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl From<String> for UserRole {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(UserRole::Employee)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: String,
    pub employee_id: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn role_enum(&self) -> UserRole {
        UserRole::from(self.role.clone())
    }

    pub fn is_privileged(&self) -> bool {
        self.role_enum().is_privileged()
    }

    /// Whether the user was seen within `window_minutes` of `now`
    pub fn is_online(&self, now: DateTime<Utc>, window_minutes: i64) -> bool {
        self.last_active
            .map(|seen| now - seen < chrono::Duration::minutes(window_minutes))
            .unwrap_or(false)
    }

    pub async fn find_by_id(db: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Look up by username, or by email ignoring case
    pub async fn find_by_login(db: &SqlitePool, login: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE username = ? OR lower(email) = lower(?)")
            .bind(login)
            .bind(login)
            .fetch_optional(db)
            .await
    }

    pub async fn list_all(db: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users ORDER BY full_name ASC")
            .fetch_all(db)
            .await
    }

    /// Active accounts with the employee role, the population dashboards report on
    pub async fn list_active_employees(db: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM users WHERE role = 'employee' AND is_active = 1 ORDER BY full_name ASC",
        )
        .fetch_all(db)
        .await
    }

    pub async fn touch(db: &SqlitePool, id: &str, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_active = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

/// Compact user reference embedded in list responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub full_name: String,
    pub employee_id: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub role: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            employee_id: user.employee_id.clone(),
            department: user.department.clone(),
            position: user.position.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UpdateEmployeeRequest {
    /// True when the request touches fields only admins may change
    pub fn has_admin_fields(&self) -> bool {
        self.department.is_some()
            || self.position.is_some()
            || self.location.is_some()
            || self.role.is_some()
            || self.is_active.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeQuery {
    pub search: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub total: i64,
    pub active: i64,
    pub pending_activation: i64,
    pub by_department: Vec<GroupCount>,
    pub by_role: Vec<GroupCount>,
}
