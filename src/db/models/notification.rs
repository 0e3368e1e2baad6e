//! In-app notification records.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LateCheckIn,
    AttendanceUpdated,
    CorrectionRequested,
    CorrectionReviewed,
    LeaveRequested,
    LeaveApproved,
    LeaveRejected,
    ScheduleUpdated,
    HolidayAdded,
    SpecialDayAdded,
    Announcement,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LateCheckIn => write!(f, "late_check_in"),
            Self::AttendanceUpdated => write!(f, "attendance_updated"),
            Self::CorrectionRequested => write!(f, "correction_requested"),
            Self::CorrectionReviewed => write!(f, "correction_reviewed"),
            Self::LeaveRequested => write!(f, "leave_requested"),
            Self::LeaveApproved => write!(f, "leave_approved"),
            Self::LeaveRejected => write!(f, "leave_rejected"),
            Self::ScheduleUpdated => write!(f, "schedule_updated"),
            Self::HolidayAdded => write!(f, "holiday_added"),
            Self::SpecialDayAdded => write!(f, "special_day_added"),
            Self::Announcement => write!(f, "announcement"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub actor_id: Option<String>,
    pub related_id: Option<String>,
    pub created_at: String,
}

/// Notification with the display name of whoever triggered it
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotificationWithActor {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub actor_id: Option<String>,
    pub related_id: Option<String>,
    pub created_at: String,
    pub actor_name: Option<String>,
}

impl Notification {
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: &str,
        query: &NotificationQuery,
    ) -> Result<Vec<NotificationWithActor>, sqlx::Error> {
        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let unread_only = query.unread_only.unwrap_or(false);

        sqlx::query_as(
            r#"
            SELECT n.*, a.full_name AS actor_name
            FROM notifications n
            LEFT JOIN users a ON a.id = n.actor_id
            WHERE n.user_id = ? AND (? = 0 OR n.is_read = 0)
            ORDER BY n.created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(db)
        .await
    }

    pub async fn unread_count(db: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .fetch_one(db)
            .await
    }

    /// Returns false when the notification does not exist or belongs to someone else
    pub async fn mark_read(db: &SqlitePool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(db: &SqlitePool, user_id: &str) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .execute(db)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(db: &SqlitePool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub message: String,
}
