//! Organization lookup lists and calendar overrides.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Which admin-managed lookup list a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Department,
    Zone,
    Role,
}

impl LookupKind {
    pub fn table(&self) -> &'static str {
        match self {
            LookupKind::Department => "departments",
            LookupKind::Zone => "zones",
            LookupKind::Role => "roles",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LookupKind::Department => "Department",
            LookupKind::Zone => "Zone",
            LookupKind::Role => "Role",
        }
    }
}

/// Department, zone or role. Only roles can be protected.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LookupItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub protected: bool,
    pub created_at: String,
}

impl LookupItem {
    pub async fn list(db: &SqlitePool, kind: LookupKind) -> Result<Vec<LookupItem>, sqlx::Error> {
        let sql = match kind {
            LookupKind::Role => "SELECT * FROM roles ORDER BY name ASC".to_string(),
            _ => format!(
                "SELECT id, name, description, 0 AS protected, created_at FROM {} ORDER BY name ASC",
                kind.table()
            ),
        };
        sqlx::query_as(&sql).fetch_all(db).await
    }

    pub async fn find(
        db: &SqlitePool,
        kind: LookupKind,
        id: &str,
    ) -> Result<Option<LookupItem>, sqlx::Error> {
        let sql = match kind {
            LookupKind::Role => "SELECT * FROM roles WHERE id = ?".to_string(),
            _ => format!(
                "SELECT id, name, description, 0 AS protected, created_at FROM {} WHERE id = ?",
                kind.table()
            ),
        };
        sqlx::query_as(&sql).bind(id).fetch_optional(db).await
    }

    pub async fn name_exists(
        db: &SqlitePool,
        kind: LookupKind,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE name = ?", kind.table());
        let count: i64 = sqlx::query_scalar(&sql).bind(name).fetch_one(db).await?;
        Ok(count > 0)
    }

    pub async fn names(db: &SqlitePool, kind: LookupKind) -> Result<Vec<String>, sqlx::Error> {
        let sql = format!("SELECT name FROM {} ORDER BY name ASC", kind.table());
        sqlx::query_scalar(&sql).fetch_all(db).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLookupRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLookupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub created_at: String,
}

impl Holiday {
    pub async fn find_on(db: &SqlitePool, date: NaiveDate) -> Result<Option<Holiday>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM holidays WHERE date = ?")
            .bind(date)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &SqlitePool) -> Result<Vec<Holiday>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM holidays ORDER BY date ASC")
            .fetch_all(db)
            .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SpecialWorkingDay {
    pub id: String,
    pub date: NaiveDate,
    pub reason: String,
    pub created_at: String,
}

impl SpecialWorkingDay {
    pub async fn find_on(
        db: &SqlitePool,
        date: NaiveDate,
    ) -> Result<Option<SpecialWorkingDay>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM special_working_days WHERE date = ?")
            .bind(date)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &SqlitePool) -> Result<Vec<SpecialWorkingDay>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM special_working_days ORDER BY date ASC")
            .fetch_all(db)
            .await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHolidayRequest {
    pub name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSpecialDayRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub reason: String,
}
