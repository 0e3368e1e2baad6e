use axum::{
    extract::State,
    Json,
};
use std::sync::Arc;

use crate::db::{User, UserSummary};
use crate::engine::dashboard::{
    self as engine, ActivityQuery, AdminStats, DailyTotals, TodayBreakdown, TopEmployees,
    TopEmployeesQuery, UserStats,
};
use crate::utils::local_now;
use crate::AppState;

use super::auth::AdminUser;
use super::error::ApiError;
use super::extract::ApiQuery;

pub async fn stats(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<UserStats>, ApiError> {
    let stats = engine::user_stats(&state.db, &user, local_now().date()).await?;
    Ok(Json(stats))
}

pub async fn activity(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> Result<Json<Vec<DailyTotals>>, ApiError> {
    let days = engine::user_activity(&state.db, &user, local_now().date(), &query).await?;
    Ok(Json(days))
}

pub async fn admin_stats(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<AdminStats>, ApiError> {
    let stats = engine::admin_stats(&state.db, local_now().date()).await?;
    Ok(Json(stats))
}

pub async fn today_breakdown(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<TodayBreakdown>, ApiError> {
    let breakdown = engine::today_breakdown_for(&state.db, local_now().date()).await?;
    Ok(Json(breakdown))
}

pub async fn admin_activity(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> Result<Json<Vec<DailyTotals>>, ApiError> {
    let days = engine::admin_activity(&state.db, local_now().date(), &query).await?;
    Ok(Json(days))
}

pub async fn not_checked_in_today(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let roster = engine::not_checked_in_today(&state.db, local_now().date()).await?;
    Ok(Json(roster))
}

pub async fn top_employees(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<TopEmployeesQuery>,
) -> Result<Json<TopEmployees>, ApiError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(ApiError::bad_request("'from' must be on or before 'to'"));
        }
    }
    let top = engine::top_employees(&state.db, local_now().date(), &query).await?;
    Ok(Json(top))
}
