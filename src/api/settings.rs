use axum::{extract::State, Json};
use chrono::Datelike;
use serde::Serialize;
use std::sync::Arc;

use crate::db::{SystemSettings, UpdateSettingsRequest};
use crate::engine::{leave, org};
use crate::utils::local_now;
use crate::AppState;

use super::auth::AdminUser;
use super::error::ApiError;
use super::extract::ApiJson;

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<SystemSettings>, ApiError> {
    Ok(Json(SystemSettings::load(&state.db).await?))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<UpdateSettingsRequest>,
) -> Result<Json<SystemSettings>, ApiError> {
    let settings = org::update_settings(&state.db, &req).await?;
    tracing::info!(actor = %admin.id, signup_enabled = settings.signup_enabled, "System settings updated");
    Ok(Json(settings))
}

#[derive(Serialize)]
pub struct ApplyDefaultsResponse {
    pub message: String,
    pub year: i32,
    pub updated: u64,
}

/// Reset this year's balance totals to the current defaults
pub async fn apply_leave_defaults(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<ApplyDefaultsResponse>, ApiError> {
    let year = local_now().year();
    let updated = leave::apply_leave_defaults(&state.db, year).await?;
    tracing::info!(actor = %admin.id, year, updated, "Leave defaults applied");

    Ok(Json(ApplyDefaultsResponse {
        message: format!("Leave defaults applied to {} balance(s)", updated),
        year,
        updated,
    }))
}
