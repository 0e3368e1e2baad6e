use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{
    CreateHolidayRequest, CreateLookupRequest, CreateSpecialDayRequest, Holiday, LookupItem,
    LookupKind, SpecialWorkingDay, UpdateLookupRequest, UpdateScheduleRequest, User,
    WorkSchedule,
};
use crate::engine::org as engine;
use crate::AppState;

use super::auth::AdminUser;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath};
use super::validation::{validate_hhmm, validate_lookup_name};
use super::MessageResponse;

pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    _user: User,
) -> Result<Json<WorkSchedule>, ApiError> {
    Ok(Json(WorkSchedule::load(&state.db).await?))
}

pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<UpdateScheduleRequest>,
) -> Result<Json<WorkSchedule>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("workStartTime", validate_hhmm(&req.work_start_time, "Start time"))
        .check("workEndTime", validate_hhmm(&req.work_end_time, "End time"));
    errors.finish()?;

    let schedule = engine::update_schedule(&state.db, &admin, &req).await?;
    Ok(Json(schedule))
}

pub async fn list_holidays(
    State(state): State<Arc<AppState>>,
    _user: User,
) -> Result<Json<Vec<Holiday>>, ApiError> {
    Ok(Json(Holiday::list(&state.db).await?))
}

pub async fn create_holiday(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<CreateHolidayRequest>,
) -> Result<(StatusCode, Json<Holiday>), ApiError> {
    validate_lookup_name(&req.name).map_err(|e| ApiError::validation_field("name", e))?;
    let holiday = engine::create_holiday(&state.db, &admin, &req).await?;
    Ok((StatusCode::CREATED, Json(holiday)))
}

pub async fn delete_holiday(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    engine::delete_holiday(&state.db, &id).await?;
    Ok(Json(MessageResponse::new("Holiday deleted")))
}

pub async fn list_special_days(
    State(state): State<Arc<AppState>>,
    _user: User,
) -> Result<Json<Vec<SpecialWorkingDay>>, ApiError> {
    Ok(Json(SpecialWorkingDay::list(&state.db).await?))
}

pub async fn create_special_day(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<CreateSpecialDayRequest>,
) -> Result<(StatusCode, Json<SpecialWorkingDay>), ApiError> {
    let day = engine::create_special_day(&state.db, &admin, &req).await?;
    Ok((StatusCode::CREATED, Json(day)))
}

pub async fn delete_special_day(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    engine::delete_special_day(&state.db, &id).await?;
    Ok(Json(MessageResponse::new("Special working day deleted")))
}

async fn list_lookup(state: &AppState, kind: LookupKind) -> Result<Json<Vec<LookupItem>>, ApiError> {
    Ok(Json(LookupItem::list(&state.db, kind).await?))
}

async fn create_lookup(
    state: &AppState,
    kind: LookupKind,
    req: CreateLookupRequest,
) -> Result<(StatusCode, Json<LookupItem>), ApiError> {
    validate_lookup_name(&req.name).map_err(|e| ApiError::validation_field("name", e))?;
    let item = engine::create_lookup(&state.db, kind, &req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_lookup(
    state: &AppState,
    kind: LookupKind,
    id: &str,
    req: UpdateLookupRequest,
) -> Result<Json<LookupItem>, ApiError> {
    if let Some(name) = &req.name {
        validate_lookup_name(name).map_err(|e| ApiError::validation_field("name", e))?;
    }
    Ok(Json(engine::update_lookup(&state.db, kind, id, &req).await?))
}

async fn delete_lookup(
    state: &AppState,
    kind: LookupKind,
    id: &str,
) -> Result<Json<MessageResponse>, ApiError> {
    engine::delete_lookup(&state.db, kind, id).await?;
    Ok(Json(MessageResponse::new(format!("{} deleted", kind.label()))))
}

/// List/create/update/delete handlers for one lookup table.
/// Reads are open to any signed-in user, writes need an admin.
macro_rules! lookup_handlers {
    ($kind:expr, $list:ident, $create:ident, $update:ident, $delete:ident) => {
        pub async fn $list(
            State(state): State<Arc<AppState>>,
            _user: User,
        ) -> Result<Json<Vec<LookupItem>>, ApiError> {
            list_lookup(&state, $kind).await
        }

        pub async fn $create(
            State(state): State<Arc<AppState>>,
            AdminUser(_admin): AdminUser,
            ApiJson(req): ApiJson<CreateLookupRequest>,
        ) -> Result<(StatusCode, Json<LookupItem>), ApiError> {
            create_lookup(&state, $kind, req).await
        }

        pub async fn $update(
            State(state): State<Arc<AppState>>,
            AdminUser(_admin): AdminUser,
            ApiPath(id): ApiPath<String>,
            ApiJson(req): ApiJson<UpdateLookupRequest>,
        ) -> Result<Json<LookupItem>, ApiError> {
            update_lookup(&state, $kind, &id, req).await
        }

        pub async fn $delete(
            State(state): State<Arc<AppState>>,
            AdminUser(_admin): AdminUser,
            ApiPath(id): ApiPath<String>,
        ) -> Result<Json<MessageResponse>, ApiError> {
            delete_lookup(&state, $kind, &id).await
        }
    };
}

lookup_handlers!(
    LookupKind::Department,
    list_departments,
    create_department,
    update_department,
    delete_department
);
lookup_handlers!(LookupKind::Zone, list_zones, create_zone, update_zone, delete_zone);
lookup_handlers!(LookupKind::Role, list_roles, create_role, update_role, delete_role);
