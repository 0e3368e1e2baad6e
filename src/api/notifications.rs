use axum::{
    extract::State,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{
    BroadcastRequest, Notification, NotificationKind, NotificationQuery, NotificationWithActor,
    User,
};
use crate::notifications::{self as notify, NotificationPayload};
use crate::AppState;

use super::auth::AdminUser;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::MessageResponse;

#[derive(Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Serialize)]
pub struct BroadcastResponse {
    pub message: String,
    pub recipients: u64,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> Result<Json<Vec<NotificationWithActor>>, ApiError> {
    let list = Notification::list_for_user(&state.db, &user.id, &query).await?;
    Ok(Json(list))
}

pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<CountResponse>, ApiError> {
    let count = Notification::unread_count(&state.db, &user.id).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !Notification::mark_read(&state.db, &user.id, &id).await? {
        return Err(ApiError::not_found("Notification not found"));
    }
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<MessageResponse>, ApiError> {
    let updated = Notification::mark_all_read(&state.db, &user.id).await?;
    Ok(Json(MessageResponse::new(format!(
        "{} notification(s) marked as read",
        updated
    ))))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !Notification::delete(&state.db, &user.id, &id).await? {
        return Err(ApiError::not_found("Notification not found"));
    }
    Ok(Json(MessageResponse::new("Notification deleted")))
}

/// Admin announcement delivered to every account
pub async fn broadcast(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let title = req.title.trim();
    let message = req.message.trim();

    let mut errors = ValidationErrorBuilder::new();
    if title.is_empty() {
        errors.add("title", "Title is required");
    }
    if message.is_empty() {
        errors.add("message", "Message is required");
    }
    errors.finish()?;

    let payload =
        NotificationPayload::new(NotificationKind::Announcement, title, message).actor(&admin.id);
    let recipients = notify::broadcast(&state.db, &payload).await?;

    tracing::info!(actor = %admin.id, recipients, "Announcement broadcast");

    Ok(Json(BroadcastResponse {
        message: "Announcement sent".to_string(),
        recipients,
    }))
}
