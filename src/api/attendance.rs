use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{
    Attendance, AttendanceCorrection, AttendanceEdit, AttendanceQuery, CorrectionRequest,
    CorrectionWithDetails, ManualAttendanceRequest, NoteRequest, ReviewCorrectionRequest, User,
};
use crate::engine::attendance::{self as engine, TodayStatus};
use crate::utils::local_now;
use crate::AppState;

use super::auth::AdminUser;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::require_uuid;

/// The caller's own attendance history, newest first
pub async fn list_own(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<AttendanceQuery>,
) -> Result<Json<Vec<Attendance>>, ApiError> {
    let records = Attendance::list_for_user(&state.db, &user.id, &query).await?;
    Ok(Json(records))
}

pub async fn check_in(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Attendance>, ApiError> {
    let record = engine::check_in(&state.db, &user, local_now()).await?;
    Ok(Json(record))
}

pub async fn check_out(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Attendance>, ApiError> {
    let record = engine::check_out(&state.db, &user, local_now()).await?;
    Ok(Json(record))
}

pub async fn today(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<TodayStatus>, ApiError> {
    let status = engine::today_status(&state.db, &user, local_now()).await?;
    Ok(Json(status))
}

pub async fn set_note(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<NoteRequest>,
) -> Result<Json<Attendance>, ApiError> {
    require_uuid(&id, "Attendance record")?;
    let record = engine::set_note(&state.db, &user, &id, &req.notes).await?;
    Ok(Json(record))
}

pub async fn request_correction(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<CorrectionRequest>,
) -> Result<(StatusCode, Json<AttendanceCorrection>), ApiError> {
    require_uuid(&id, "Attendance record")?;
    let correction = engine::request_correction(&state.db, &user, &id, &req).await?;
    Ok((StatusCode::CREATED, Json(correction)))
}

pub async fn my_corrections(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<AttendanceCorrection>>, ApiError> {
    let corrections = AttendanceCorrection::list_for_user(&state.db, &user.id).await?;
    Ok(Json(corrections))
}

/// Every correction request in any state, for the admin review queue
pub async fn all_corrections(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<CorrectionWithDetails>>, ApiError> {
    let corrections = CorrectionWithDetails::list_all(&state.db).await?;
    Ok(Json(corrections))
}

pub async fn review_correction(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<ReviewCorrectionRequest>,
) -> Result<Json<AttendanceCorrection>, ApiError> {
    require_uuid(&id, "Correction request")?;
    let correction = engine::review_correction(
        &state.db,
        &admin,
        &id,
        &req,
        state.config.policy.leave_day_hours,
    )
    .await?;
    Ok(Json(correction))
}

pub async fn admin_edit(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(edit): ApiJson<AttendanceEdit>,
) -> Result<Json<Attendance>, ApiError> {
    require_uuid(&id, "Attendance record")?;
    if edit.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    let record = engine::admin_edit(
        &state.db,
        &admin,
        &id,
        &edit,
        state.config.policy.leave_day_hours,
    )
    .await?;
    Ok(Json(record))
}

pub async fn create_manual(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<ManualAttendanceRequest>,
) -> Result<(StatusCode, Json<Attendance>), ApiError> {
    require_uuid(&req.user_id, "Employee")?;
    let record =
        engine::create_manual(&state.db, &admin, &req, state.config.policy.leave_day_hours)
            .await?;
    Ok((StatusCode::CREATED, Json(record)))
}
