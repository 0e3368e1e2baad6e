//! Singleton documents: the work schedule and system settings.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::utils::parse_hhmm;

#[derive(Debug, Clone, FromRow)]
struct WorkScheduleRow {
    work_days: String,
    work_start_time: String,
    work_end_time: String,
    updated_at: String,
}

/// Weekly working pattern. Weekdays use 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSchedule {
    pub work_days: Vec<u32>,
    /// "HH:mm"
    pub work_start_time: String,
    /// "HH:mm"
    pub work_end_time: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Default for WorkSchedule {
    fn default() -> Self {
        Self {
            work_days: vec![1, 2, 3, 4, 5],
            work_start_time: "09:00".to_string(),
            work_end_time: "17:00".to_string(),
            updated_at: String::new(),
        }
    }
}

impl WorkSchedule {
    pub fn is_work_day(&self, weekday: Weekday) -> bool {
        self.work_days.contains(&weekday.num_days_from_sunday())
    }

    /// Schedule start, falling back to 09:00 for a malformed stored value
    pub fn start_time(&self) -> NaiveTime {
        parse_hhmm(&self.work_start_time).unwrap_or_else(|| {
            tracing::warn!(value = %self.work_start_time, "Invalid stored work start time");
            NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
        })
    }

    pub async fn load(db: &SqlitePool) -> Result<WorkSchedule, sqlx::Error> {
        let row: Option<WorkScheduleRow> = sqlx::query_as(
            "SELECT work_days, work_start_time, work_end_time, updated_at FROM work_schedule WHERE id = 1",
        )
        .fetch_optional(db)
        .await?;

        Ok(match row {
            Some(row) => WorkSchedule {
                work_days: match serde_json::from_str(&row.work_days) {
                    Ok(days) => days,
                    Err(e) => {
                        tracing::warn!(
                            "Unreadable work_days {:?}, using the default week: {}",
                            row.work_days,
                            e
                        );
                        WorkSchedule::default().work_days
                    }
                },
                work_start_time: row.work_start_time,
                work_end_time: row.work_end_time,
                updated_at: row.updated_at,
            },
            None => WorkSchedule::default(),
        })
    }

    pub async fn save(&self, db: &SqlitePool) -> Result<(), sqlx::Error> {
        let mut days = self.work_days.clone();
        days.sort_unstable();
        days.dedup();
        let work_days = serde_json::to_string(&days).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            r#"
            INSERT INTO work_schedule (id, work_days, work_start_time, work_end_time, updated_at)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                work_days = excluded.work_days,
                work_start_time = excluded.work_start_time,
                work_end_time = excluded.work_end_time,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&work_days)
        .bind(&self.work_start_time)
        .bind(&self.work_end_time)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(db)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    pub work_days: Vec<u32>,
    pub work_start_time: String,
    pub work_end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub signup_enabled: bool,
    pub default_sick_leave: i64,
    pub default_vacation: i64,
    pub default_personal_leave: i64,
    pub updated_at: String,
}

impl SystemSettings {
    pub async fn load(db: &SqlitePool) -> Result<SystemSettings, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT signup_enabled, default_sick_leave, default_vacation,
                   default_personal_leave, updated_at
            FROM system_settings WHERE id = 1
            "#,
        )
        .fetch_one(db)
        .await
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub signup_enabled: Option<bool>,
    pub default_sick_leave: Option<i64>,
    pub default_vacation: Option<i64>,
    pub default_personal_leave: Option<i64>,
}
