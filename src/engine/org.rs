//! Admin-managed configuration: lookup lists, schedule, calendar overrides.
//!
//! Schedule, holiday and special-day writes are announced to everyone.

use sqlx::SqlitePool;
use tracing::info;

use crate::db::{
    CreateHolidayRequest, CreateLookupRequest, CreateSpecialDayRequest, Holiday, LookupItem,
    LookupKind, NotificationKind, SpecialWorkingDay, UpdateLookupRequest, UpdateScheduleRequest,
    UpdateSettingsRequest, SystemSettings, User, WorkSchedule,
};
use crate::notifications::{self, NotificationPayload};
use crate::utils::parse_hhmm;

use super::{is_unique_violation, new_id, now_rfc3339, EngineError, EngineResult};

fn duplicate_name(kind: LookupKind, name: &str) -> EngineError {
    EngineError::Conflict(format!("{} \"{}\" already exists", kind.label(), name))
}

fn map_name_conflict(kind: LookupKind, name: &str) -> impl FnOnce(sqlx::Error) -> EngineError + '_ {
    move |e| {
        if is_unique_violation(&e) {
            duplicate_name(kind, name)
        } else {
            EngineError::Database(e)
        }
    }
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

pub async fn create_lookup(db: &SqlitePool, kind: LookupKind, req: &CreateLookupRequest) -> EngineResult<LookupItem> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("Name is required".to_string()));
    }
    if LookupItem::name_exists(db, kind, name).await? {
        return Err(duplicate_name(kind, name));
    }

    let id = new_id();
    let sql = format!(
        "INSERT INTO {} (id, name, description, created_at) VALUES (?, ?, ?, ?)",
        kind.table()
    );
    sqlx::query(&sql)
        .bind(&id)
        .bind(name)
        .bind(clean_description(req.description.as_deref()))
        .bind(now_rfc3339())
        .execute(db)
        .await
        .map_err(map_name_conflict(kind, name))?;

    info!(id = %id, name = %name, "{} created", kind.label());

    LookupItem::find(db, kind, &id)
        .await?
        .ok_or(EngineError::NotFound(kind.label()))
}

/// Rename or re-describe. A rename does not rewrite users already holding the old name.
pub async fn update_lookup(
    db: &SqlitePool,
    kind: LookupKind,
    id: &str,
    req: &UpdateLookupRequest,
) -> EngineResult<LookupItem> {
    let existing = LookupItem::find(db, kind, id)
        .await?
        .ok_or(EngineError::NotFound(kind.label()))?;

    let name = match req.name.as_deref().map(str::trim) {
        Some("") => return Err(EngineError::Validation("Name is required".to_string())),
        Some(name) => name.to_string(),
        None => existing.name.clone(),
    };
    if name != existing.name && LookupItem::name_exists(db, kind, &name).await? {
        return Err(duplicate_name(kind, &name));
    }
    let description = match req.description.as_deref() {
        Some(d) => clean_description(Some(d)),
        None => existing.description.clone(),
    };

    let sql = format!("UPDATE {} SET name = ?, description = ? WHERE id = ?", kind.table());
    sqlx::query(&sql)
        .bind(&name)
        .bind(&description)
        .bind(id)
        .execute(db)
        .await
        .map_err(map_name_conflict(kind, &name))?;

    LookupItem::find(db, kind, id)
        .await?
        .ok_or(EngineError::NotFound(kind.label()))
}

pub async fn delete_lookup(db: &SqlitePool, kind: LookupKind, id: &str) -> EngineResult<()> {
    let existing = LookupItem::find(db, kind, id)
        .await?
        .ok_or(EngineError::NotFound(kind.label()))?;
    if existing.protected {
        return Err(EngineError::ProtectedResource(format!(
            "{} \"{}\"",
            kind.label(),
            existing.name
        )));
    }

    let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
    sqlx::query(&sql).bind(id).execute(db).await?;

    info!(id = %id, name = %existing.name, "{} deleted", kind.label());
    Ok(())
}

/// Days must be 0..=6 and the start strictly before the end
pub fn validate_schedule(req: &UpdateScheduleRequest) -> EngineResult<WorkSchedule> {
    if let Some(day) = req.work_days.iter().find(|d| **d > 6) {
        return Err(EngineError::Validation(format!(
            "Invalid work day {}: use 0 (Sunday) to 6 (Saturday)",
            day
        )));
    }
    let start = parse_hhmm(&req.work_start_time).ok_or_else(|| {
        EngineError::Validation("Work start time must be in HH:mm format".to_string())
    })?;
    let end = parse_hhmm(&req.work_end_time).ok_or_else(|| {
        EngineError::Validation("Work end time must be in HH:mm format".to_string())
    })?;
    if start >= end {
        return Err(EngineError::Validation(
            "Work start time must be before end time".to_string(),
        ));
    }

    let mut work_days = req.work_days.clone();
    work_days.sort_unstable();
    work_days.dedup();

    Ok(WorkSchedule {
        work_days,
        work_start_time: start.format("%H:%M").to_string(),
        work_end_time: end.format("%H:%M").to_string(),
        updated_at: String::new(),
    })
}

pub async fn update_schedule(db: &SqlitePool, admin: &User, req: &UpdateScheduleRequest) -> EngineResult<WorkSchedule> {
    let schedule = validate_schedule(req)?;
    schedule.save(db).await?;

    info!(
        work_days = ?schedule.work_days,
        start = %schedule.work_start_time,
        end = %schedule.work_end_time,
        actor = %admin.id,
        "Work schedule updated"
    );

    let payload = NotificationPayload::new(
        NotificationKind::ScheduleUpdated,
        "Work Schedule Updated",
        format!(
            "Working hours are now {} to {}",
            schedule.work_start_time, schedule.work_end_time
        ),
    )
    .actor(&admin.id);
    notifications::broadcast(db, &payload).await?;

    Ok(WorkSchedule::load(db).await?)
}

pub async fn create_holiday(db: &SqlitePool, admin: &User, req: &CreateHolidayRequest) -> EngineResult<Holiday> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("Holiday name is required".to_string()));
    }
    if SpecialWorkingDay::find_on(db, req.date).await?.is_some() {
        return Err(EngineError::ConflictingDayType(format!(
            "{} is already a special working day",
            req.date
        )));
    }
    let already = || EngineError::ConflictingDayType(format!("{} is already a holiday", req.date));
    if Holiday::find_on(db, req.date).await?.is_some() {
        return Err(already());
    }

    let id = new_id();
    sqlx::query("INSERT INTO holidays (id, name, date, created_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(name)
        .bind(req.date)
        .bind(now_rfc3339())
        .execute(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                already()
            } else {
                EngineError::Database(e)
            }
        })?;

    info!(holiday_id = %id, date = %req.date, actor = %admin.id, "Holiday added");

    let payload = NotificationPayload::new(
        NotificationKind::HolidayAdded,
        "Holiday Added",
        format!("{} on {} is a holiday", name, req.date),
    )
    .actor(&admin.id)
    .related(&id);
    notifications::broadcast(db, &payload).await?;

    Holiday::find_on(db, req.date)
        .await?
        .ok_or(EngineError::NotFound("Holiday"))
}

pub async fn delete_holiday(db: &SqlitePool, id: &str) -> EngineResult<()> {
    let result = sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(EngineError::NotFound("Holiday"));
    }
    info!(holiday_id = %id, "Holiday deleted");
    Ok(())
}

pub async fn create_special_day(
    db: &SqlitePool,
    admin: &User,
    req: &CreateSpecialDayRequest,
) -> EngineResult<SpecialWorkingDay> {
    if Holiday::find_on(db, req.date).await?.is_some() {
        return Err(EngineError::ConflictingDayType(format!(
            "{} is already a holiday",
            req.date
        )));
    }
    let already =
        || EngineError::ConflictingDayType(format!("{} is already a special working day", req.date));
    if SpecialWorkingDay::find_on(db, req.date).await?.is_some() {
        return Err(already());
    }

    let reason = match req.reason.trim() {
        "" => "Special working day",
        reason => reason,
    };

    let id = new_id();
    sqlx::query("INSERT INTO special_working_days (id, date, reason, created_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(req.date)
        .bind(reason)
        .bind(now_rfc3339())
        .execute(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                already()
            } else {
                EngineError::Database(e)
            }
        })?;

    info!(special_day_id = %id, date = %req.date, actor = %admin.id, "Special working day added");

    let payload = NotificationPayload::new(
        NotificationKind::SpecialDayAdded,
        "Special Working Day",
        format!("{} is a working day: {}", req.date, reason),
    )
    .actor(&admin.id)
    .related(&id);
    notifications::broadcast(db, &payload).await?;

    SpecialWorkingDay::find_on(db, req.date)
        .await?
        .ok_or(EngineError::NotFound("Special working day"))
}

pub async fn delete_special_day(db: &SqlitePool, id: &str) -> EngineResult<()> {
    let result = sqlx::query("DELETE FROM special_working_days WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(EngineError::NotFound("Special working day"));
    }
    info!(special_day_id = %id, "Special working day deleted");
    Ok(())
}

pub async fn update_settings(db: &SqlitePool, req: &UpdateSettingsRequest) -> EngineResult<SystemSettings> {
    for (value, label) in [
        (req.default_sick_leave, "sick leave"),
        (req.default_vacation, "vacation"),
        (req.default_personal_leave, "personal leave"),
    ] {
        if matches!(value, Some(days) if !(0..=366).contains(&days)) {
            return Err(EngineError::Validation(format!(
                "Default {} must be between 0 and 366 days",
                label
            )));
        }
    }

    sqlx::query(
        r#"
        UPDATE system_settings SET
            signup_enabled = COALESCE(?, signup_enabled),
            default_sick_leave = COALESCE(?, default_sick_leave),
            default_vacation = COALESCE(?, default_vacation),
            default_personal_leave = COALESCE(?, default_personal_leave),
            updated_at = ?
        WHERE id = 1
        "#,
    )
    .bind(req.signup_enabled)
    .bind(req.default_sick_leave)
    .bind(req.default_vacation)
    .bind(req.default_personal_leave)
    .bind(now_rfc3339())
    .execute(db)
    .await?;

    info!("System settings updated");
    Ok(SystemSettings::load(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(days: Vec<u32>, start: &str, end: &str) -> UpdateScheduleRequest {
        UpdateScheduleRequest {
            work_days: days,
            work_start_time: start.into(),
            work_end_time: end.into(),
        }
    }

    #[test]
    fn test_validate_schedule_normalizes() {
        let validated = validate_schedule(&schedule(vec![5, 1, 3, 1], "08:30", "16:45:00")).unwrap();
        assert_eq!(validated.work_days, vec![1, 3, 5]);
        assert_eq!(validated.work_start_time, "08:30");
        assert_eq!(validated.work_end_time, "16:45");
    }

    #[test]
    fn test_validate_schedule_rejects_bad_input() {
        assert!(validate_schedule(&schedule(vec![7], "09:00", "17:00")).is_err());
        assert!(validate_schedule(&schedule(vec![1], "9am", "17:00")).is_err());
        assert!(validate_schedule(&schedule(vec![1], "17:00", "09:00")).is_err());
        assert!(validate_schedule(&schedule(vec![1], "09:00", "09:00")).is_err());
    }

    #[test]
    fn test_empty_week_is_allowed() {
        assert!(validate_schedule(&schedule(vec![], "09:00", "17:00")).is_ok());
    }
}
