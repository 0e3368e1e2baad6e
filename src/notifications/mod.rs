//! In-app notification delivery.
//!
//! A notification is a row in `notifications`; delivery is the insert. Fan-out
//! to admins or to everyone is a single `INSERT ... SELECT` over `users`, so
//! it costs one statement regardless of headcount and either lands for all
//! recipients or for none.

use sqlx::{Executor, Sqlite};

use crate::db::NotificationKind;

/// Notification payload with event details
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub actor_id: Option<String>,
    pub related_id: Option<String>,
}

impl NotificationPayload {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            actor_id: None,
            related_id: None,
        }
    }

    /// Who triggered the event
    pub fn actor(mut self, actor_id: &str) -> Self {
        self.actor_id = Some(actor_id.to_string());
        self
    }

    /// The record the event is about
    pub fn related(mut self, related_id: &str) -> Self {
        self.related_id = Some(related_id.to_string());
        self
    }
}

/// Deliver to a single user
pub async fn notify_user<'e, E>(
    executor: E,
    user_id: &str,
    payload: &NotificationPayload,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, kind, title, message, is_read, actor_id, related_id, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(payload.kind.to_string())
    .bind(&payload.title)
    .bind(&payload.message)
    .bind(&payload.actor_id)
    .bind(&payload.related_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(executor)
    .await?;

    tracing::debug!(user_id = user_id, kind = %payload.kind, "Notification delivered");
    Ok(())
}

/// Deliver one copy to every HR admin and admin. Returns the recipient count.
pub async fn notify_admins<'e, E>(executor: E, payload: &NotificationPayload) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    fan_out(executor, "WHERE role IN ('hr_admin', 'admin')", payload).await
}

/// Deliver one copy to every user in the system. Returns the recipient count.
pub async fn broadcast<'e, E>(executor: E, payload: &NotificationPayload) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    fan_out(executor, "", payload).await
}

/// Ids are random v4 UUIDs built in SQL, the same shape `notify_user` binds.
async fn fan_out<'e, E>(
    executor: E,
    filter: &str,
    payload: &NotificationPayload,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        r#"
        INSERT INTO notifications (id, user_id, kind, title, message, is_read, actor_id, related_id, created_at)
        SELECT
            substr(h, 1, 8) || '-' || substr(h, 9, 4) || '-4' || substr(h, 14, 3) || '-'
                || substr('89ab', 1 + (random() & 3), 1) || substr(h, 18, 3) || '-'
                || substr(h, 21, 12),
            id, ?, ?, ?, 0, ?, ?, ?
        FROM (SELECT id, lower(hex(randomblob(16))) AS h FROM users {})
        "#,
        filter
    );

    let result = sqlx::query(&sql)
        .bind(payload.kind.to_string())
        .bind(&payload.title)
        .bind(&payload.message)
        .bind(&payload.actor_id)
        .bind(&payload.related_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(executor)
        .await?;

    tracing::info!(
        kind = %payload.kind,
        recipients = result.rows_affected(),
        "Notification fanned out"
    );
    Ok(result.rows_affected())
}
