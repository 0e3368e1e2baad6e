use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{Conversation, Message, SendMessageRequest, ThreadQuery, User};
use crate::engine::messaging;
use crate::AppState;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::require_uuid;

#[derive(Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Serialize)]
pub struct MarkedResponse {
    pub updated: u64,
}

pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<CountResponse>, ApiError> {
    let count = Message::unread_count(&state.db, &user.id).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn conversations(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let list =
        messaging::conversations(&state.db, &user, state.config.policy.online_window_minutes)
            .await?;
    Ok(Json(list))
}

/// Messages exchanged with `other_id`, oldest first
pub async fn thread(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(other_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ThreadQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    require_uuid(&other_id, "User")?;
    let messages = Message::thread(&state.db, &user.id, &other_id, &query).await?;
    Ok(Json(messages))
}

pub async fn send(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(receiver_id): ApiPath<String>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    require_uuid(&receiver_id, "Recipient")?;
    let message = messaging::send_message(&state.db, &user, &receiver_id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(sender_id): ApiPath<String>,
) -> Result<Json<MarkedResponse>, ApiError> {
    let updated = messaging::mark_read(&state.db, &user, &sender_id).await?;
    Ok(Json(MarkedResponse { updated }))
}
