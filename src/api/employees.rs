use axum::{
    extract::State,
    Json,
};
use std::sync::Arc;

use crate::db::{
    Attendance, AttendanceQuery, EmployeeQuery, EmployeeSummary, UpdateEmployeeRequest, User,
};
use crate::engine::{accounts, EngineError};
use crate::AppState;

use super::auth::AdminUser;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::{require_uuid, validate_full_name, validate_phone};

pub async fn list(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<EmployeeQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = accounts::list_employees(&state.db, &query).await?;
    Ok(Json(users))
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<EmployeeSummary>, ApiError> {
    let summary = accounts::employee_summary(&state.db).await?;
    Ok(Json(summary))
}

pub async fn get_employee(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<User>, ApiError> {
    require_uuid(&id, "Employee")?;
    let user = User::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    Ok(Json(user))
}

/// Admins edit anyone; employees only their own name and phone
pub async fn update(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateEmployeeRequest>,
) -> Result<Json<User>, ApiError> {
    require_uuid(&id, "Employee")?;

    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &req.full_name {
        errors.check("fullName", validate_full_name(name));
    }
    errors.check("phone", validate_phone(&req.phone));
    errors.finish()?;

    let updated = accounts::update_employee(&state.db, &user, &id, req).await?;
    Ok(Json(updated))
}

/// One employee's attendance. Notes are only visible to their owner.
pub async fn attendance(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<AttendanceQuery>,
) -> Result<Json<Vec<Attendance>>, ApiError> {
    require_uuid(&id, "Employee")?;
    if user.id != id && !user.is_privileged() {
        return Err(EngineError::NotAuthorized.into());
    }
    if User::find_by_id(&state.db, &id).await?.is_none() {
        return Err(ApiError::not_found("Employee not found"));
    }

    let records = Attendance::list_for_user(&state.db, &id, &query).await?;
    let records = if user.id == id {
        records
    } else {
        records.into_iter().map(Attendance::without_notes).collect()
    };
    Ok(Json(records))
}
