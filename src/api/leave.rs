use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Datelike;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{
    CreateLeaveRequest, Leave, LeaveBalanceResponse, LeaveQuery, LeaveWithUser,
    RejectLeaveRequest, User,
};
use crate::engine::leave as engine;
use crate::utils::local_now;
use crate::AppState;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::require_uuid;

pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<LeaveQuery>,
) -> Result<Json<Vec<LeaveWithUser>>, ApiError> {
    let leaves = engine::list_leaves(&state.db, &user, &query).await?;
    Ok(Json(leaves))
}

#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    pub year: Option<i32>,
}

pub async fn balance(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<BalanceQuery>,
) -> Result<Json<LeaveBalanceResponse>, ApiError> {
    let year = query.year.unwrap_or_else(|| local_now().year());
    let balance = engine::get_balance(&state.db, &user.id, year).await?;
    Ok(Json(balance))
}

pub async fn request_leave(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreateLeaveRequest>,
) -> Result<(StatusCode, Json<Leave>), ApiError> {
    let leave = engine::request_leave(&state.db, &user, &req).await?;
    Ok((StatusCode::CREATED, Json(leave)))
}

// The role check for approve/reject is done by the engine
pub async fn approve(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Leave>, ApiError> {
    require_uuid(&id, "Leave request")?;
    let leave = engine::approve_leave(&state.db, &user, &id).await?;
    Ok(Json(leave))
}

pub async fn reject(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
    body: Option<ApiJson<RejectLeaveRequest>>,
) -> Result<Json<Leave>, ApiError> {
    require_uuid(&id, "Leave request")?;
    let req = body.map(|ApiJson(req)| req).unwrap_or_default();
    let leave = engine::reject_leave(&state.db, &user, &id, req.reason.as_deref()).await?;
    Ok(Json(leave))
}
