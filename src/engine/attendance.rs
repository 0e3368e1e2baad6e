//! Check-in/out, working-day resolution, admin edits and corrections.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::info;

use crate::db::{
    Attendance, AttendanceCorrection, AttendanceEdit, AttendanceStatus, CorrectionRequest,
    CorrectionStatus, Holiday, ManualAttendanceRequest, NotificationKind, ReviewCorrectionRequest,
    SpecialWorkingDay, User, WorkSchedule,
};
use crate::notifications::{self, NotificationPayload};
use crate::utils::{parse_clock_on, worked_hours};

use super::{is_unique_violation, new_id, now_rfc3339, EngineError, EngineResult};

/// Whether check-in is permitted on a date, and why not
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDay {
    pub is_working_day: bool,
    pub reason: Option<String>,
}

impl WorkingDay {
    fn working() -> Self {
        Self {
            is_working_day: true,
            reason: None,
        }
    }

    fn off(reason: String) -> Self {
        Self {
            is_working_day: false,
            reason: Some(reason),
        }
    }
}

/// Special working day, then holiday, then the weekly schedule.
pub fn resolve_day(
    date: NaiveDate,
    schedule: &WorkSchedule,
    holiday: Option<&Holiday>,
    special: Option<&SpecialWorkingDay>,
) -> WorkingDay {
    if special.is_some() {
        return WorkingDay::working();
    }
    if let Some(holiday) = holiday {
        return WorkingDay::off(format!("Holiday: {}", holiday.name));
    }
    if schedule.is_work_day(date.weekday()) {
        return WorkingDay::working();
    }
    WorkingDay::off("Weekend / Off Day".to_string())
}

pub async fn resolve_working_day(db: &SqlitePool, date: NaiveDate) -> EngineResult<WorkingDay> {
    let special = SpecialWorkingDay::find_on(db, date).await?;
    let holiday = Holiday::find_on(db, date).await?;
    let schedule = WorkSchedule::load(db).await?;
    Ok(resolve_day(date, &schedule, holiday.as_ref(), special.as_ref()))
}

/// Late once the wall clock passes the scheduled start minute
pub fn classify_check_in(at: NaiveTime, start: NaiveTime) -> AttendanceStatus {
    let minute_of_day = |t: NaiveTime| t.hour() * 60 + t.minute();
    if minute_of_day(at) > minute_of_day(start) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

pub async fn check_in(db: &SqlitePool, user: &User, now: NaiveDateTime) -> EngineResult<Attendance> {
    let today = now.date();

    let day = resolve_working_day(db, today).await?;
    if !day.is_working_day {
        return Err(EngineError::NonWorkingDay(day.reason.unwrap_or_default()));
    }

    if let Some(existing) = Attendance::find_for_day(db, &user.id, today).await? {
        if existing.check_in.is_some() {
            return Err(EngineError::AlreadyCheckedIn);
        }
    }

    let schedule = WorkSchedule::load(db).await?;
    let status = classify_check_in(now.time(), schedule.start_time());
    claim_check_in(db, &user.id, now, status).await?;

    let record = Attendance::find_for_day(db, &user.id, today)
        .await?
        .ok_or(EngineError::NotFound("Attendance record"))?;

    info!(user_id = %user.id, attendance_id = %record.id, status = %status, "Checked in");

    if status == AttendanceStatus::Late {
        let payload = NotificationPayload::new(
            NotificationKind::LateCheckIn,
            "Late Check-in",
            format!(
                "You checked in at {} which is after the scheduled start time of {}",
                now.format("%H:%M"),
                schedule.work_start_time
            ),
        )
        .related(&record.id);
        notifications::notify_user(db, &user.id, &payload).await?;
    }

    Ok(record)
}

/// Write a check-in for `now.date()`.
///
/// A row without a check-in (e.g. pre-marked by an admin) is claimed; a
/// concurrent check-in that got there first leaves nothing to update.
async fn claim_check_in(
    db: &SqlitePool,
    user_id: &str,
    now: NaiveDateTime,
    status: AttendanceStatus,
) -> EngineResult<()> {
    let timestamp = now_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (id, user_id, date, check_in, check_out, hours, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, NULL, 0, ?, ?, ?)
        ON CONFLICT(user_id, date) DO UPDATE SET
            check_in = excluded.check_in,
            status = excluded.status,
            updated_at = excluded.updated_at
        WHERE attendance.check_in IS NULL
        "#,
    )
    .bind(new_id())
    .bind(user_id)
    .bind(now.date())
    .bind(now)
    .bind(status.to_string())
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::AlreadyCheckedIn);
    }
    Ok(())
}

pub async fn check_out(db: &SqlitePool, user: &User, now: NaiveDateTime) -> EngineResult<Attendance> {
    let today = now.date();
    let record = Attendance::find_for_day(db, &user.id, today)
        .await?
        .ok_or(EngineError::NoCheckIn)?;

    let Some(checked_in) = record.check_in else {
        return Err(EngineError::NoCheckIn);
    };
    if record.check_out.is_some() {
        return Err(EngineError::AlreadyCheckedOut);
    }

    let hours = worked_hours(checked_in, now);
    let result = sqlx::query(
        "UPDATE attendance SET check_out = ?, hours = ?, updated_at = ? WHERE id = ? AND check_out IS NULL",
    )
    .bind(now)
    .bind(hours)
    .bind(now_rfc3339())
    .bind(&record.id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::AlreadyCheckedOut);
    }

    info!(user_id = %user.id, attendance_id = %record.id, hours, "Checked out");

    Attendance::find_by_id(db, &record.id)
        .await?
        .ok_or(EngineError::NotFound("Attendance record"))
}

/// Today's record together with the working-day verdict
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStatus {
    pub date: NaiveDate,
    pub attendance: Option<Attendance>,
    #[serde(flatten)]
    pub working_day: WorkingDay,
    pub schedule: WorkSchedule,
}

pub async fn today_status(db: &SqlitePool, user: &User, now: NaiveDateTime) -> EngineResult<TodayStatus> {
    let date = now.date();
    Ok(TodayStatus {
        date,
        attendance: Attendance::find_for_day(db, &user.id, date).await?,
        working_day: resolve_working_day(db, date).await?,
        schedule: WorkSchedule::load(db).await?,
    })
}

/// Field values an edit resolves to
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEdit {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub hours: f64,
}

fn parse_edit_time(date: NaiveDate, value: &str, field: &str) -> EngineResult<Option<NaiveDateTime>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_clock_on(date, value)
        .map(Some)
        .ok_or_else(|| EngineError::Validation(format!("Invalid {} time: {}", field, value)))
}

/// Apply an edit on top of a record's current values.
///
/// Absent and leave null both clock times; leave is credited with
/// `leave_day_hours`. Otherwise hours come from the clock pair, or 0 when
/// either side is missing. Moving the date carries unedited times along.
pub fn resolve_edit(current: &Attendance, edit: &AttendanceEdit, leave_day_hours: f64) -> EngineResult<ResolvedEdit> {
    let date = edit.date.unwrap_or(current.date);
    let status = edit.status.unwrap_or_else(|| current.status_enum());

    if status.clears_times() {
        let hours = if status == AttendanceStatus::Leave {
            leave_day_hours
        } else {
            0.0
        };
        return Ok(ResolvedEdit {
            date,
            status,
            check_in: None,
            check_out: None,
            hours,
        });
    }

    let rebase = |t: Option<NaiveDateTime>| t.map(|t| date.and_time(t.time()));
    let check_in = match &edit.check_in {
        Some(value) => parse_edit_time(date, value, "check-in")?,
        None => rebase(current.check_in),
    };
    let check_out = match &edit.check_out {
        Some(value) => parse_edit_time(date, value, "check-out")?,
        None => rebase(current.check_out),
    };

    let hours = match (check_in, check_out) {
        (Some(start), Some(end)) => {
            if end < start {
                return Err(EngineError::Validation(
                    "Check-out must be after check-in".to_string(),
                ));
            }
            worked_hours(start, end)
        }
        _ => 0.0,
    };

    Ok(ResolvedEdit {
        date,
        status,
        check_in,
        check_out,
        hours,
    })
}

async fn write_edit<'e, E>(executor: E, id: &str, resolved: &ResolvedEdit) -> EngineResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE attendance
        SET date = ?, status = ?, check_in = ?, check_out = ?, hours = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(resolved.date)
    .bind(resolved.status.to_string())
    .bind(resolved.check_in)
    .bind(resolved.check_out)
    .bind(resolved.hours)
    .bind(now_rfc3339())
    .bind(id)
    .execute(executor)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            EngineError::Conflict("An attendance record already exists for that date".to_string())
        } else {
            EngineError::Database(e)
        }
    })?;
    Ok(())
}

fn updated_payload(admin: &User, resolved: &ResolvedEdit, record_id: &str) -> NotificationPayload {
    NotificationPayload::new(
        NotificationKind::AttendanceUpdated,
        "Attendance Updated",
        format!(
            "{} updated your attendance for {} (status: {})",
            admin.full_name, resolved.date, resolved.status
        ),
    )
    .actor(&admin.id)
    .related(record_id)
}

/// Admin override of a record; always notifies the owner
pub async fn admin_edit(
    db: &SqlitePool,
    admin: &User,
    id: &str,
    edit: &AttendanceEdit,
    leave_day_hours: f64,
) -> EngineResult<Attendance> {
    if !admin.is_privileged() {
        return Err(EngineError::NotAuthorized);
    }

    let current = Attendance::find_by_id(db, id)
        .await?
        .ok_or(EngineError::NotFound("Attendance record"))?;

    let resolved = resolve_edit(&current, edit, leave_day_hours)?;
    write_edit(db, id, &resolved).await?;

    info!(
        attendance_id = %id,
        user_id = %current.user_id,
        status = %resolved.status,
        actor = %admin.id,
        "Attendance edited"
    );

    notifications::notify_user(db, &current.user_id, &updated_payload(admin, &resolved, id)).await?;

    Attendance::find_by_id(db, id)
        .await?
        .ok_or(EngineError::NotFound("Attendance record"))
}

fn duplicate_attendance() -> EngineError {
    EngineError::Conflict("An attendance record already exists for this employee on that date".to_string())
}

async fn insert_attendance(
    db: &SqlitePool,
    id: &str,
    user_id: &str,
    resolved: &ResolvedEdit,
    timestamp: &str,
) -> EngineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance (id, user_id, date, check_in, check_out, hours, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(resolved.date)
    .bind(resolved.check_in)
    .bind(resolved.check_out)
    .bind(resolved.hours)
    .bind(resolved.status.to_string())
    .bind(timestamp)
    .bind(timestamp)
    .execute(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            duplicate_attendance()
        } else {
            EngineError::Database(e)
        }
    })?;
    Ok(())
}

/// Admin creates a record directly, with the same rules as an edit
pub async fn create_manual(
    db: &SqlitePool,
    admin: &User,
    req: &ManualAttendanceRequest,
    leave_day_hours: f64,
) -> EngineResult<Attendance> {
    if !admin.is_privileged() {
        return Err(EngineError::NotAuthorized);
    }

    let employee = User::find_by_id(db, &req.user_id)
        .await?
        .ok_or(EngineError::NotFound("Employee"))?;

    if Attendance::find_for_day(db, &employee.id, req.date).await?.is_some() {
        return Err(duplicate_attendance());
    }

    let timestamp = now_rfc3339();
    let blank = Attendance {
        id: new_id(),
        user_id: employee.id.clone(),
        date: req.date,
        check_in: None,
        check_out: None,
        hours: 0.0,
        status: req.status.to_string(),
        notes: None,
        created_at: timestamp.clone(),
        updated_at: timestamp.clone(),
    };
    let edit = AttendanceEdit {
        status: Some(req.status),
        check_in: req.check_in.clone(),
        check_out: req.check_out.clone(),
        date: None,
    };
    let resolved = resolve_edit(&blank, &edit, leave_day_hours)?;

    insert_attendance(db, &blank.id, &employee.id, &resolved, &timestamp).await?;

    info!(attendance_id = %blank.id, user_id = %employee.id, actor = %admin.id, "Attendance recorded manually");

    notifications::notify_user(db, &employee.id, &updated_payload(admin, &resolved, &blank.id)).await?;

    Attendance::find_by_id(db, &blank.id)
        .await?
        .ok_or(EngineError::NotFound("Attendance record"))
}

/// Overwrite the owner's private note
pub async fn set_note(db: &SqlitePool, user: &User, id: &str, notes: &str) -> EngineResult<Attendance> {
    let record = Attendance::find_by_id(db, id)
        .await?
        .ok_or(EngineError::NotFound("Attendance record"))?;
    if record.user_id != user.id {
        return Err(EngineError::Forbidden(
            "You can only add notes to your own attendance".to_string(),
        ));
    }

    let notes = notes.trim();
    sqlx::query("UPDATE attendance SET notes = ?, updated_at = ? WHERE id = ?")
        .bind(if notes.is_empty() { None } else { Some(notes) })
        .bind(now_rfc3339())
        .bind(id)
        .execute(db)
        .await?;

    Attendance::find_by_id(db, id)
        .await?
        .ok_or(EngineError::NotFound("Attendance record"))
}

/// Store a pending correction. The partial unique index turns a lost race
/// into `DuplicatePendingCorrection`.
async fn insert_correction(
    db: &SqlitePool,
    id: &str,
    user_id: &str,
    attendance_id: &str,
    reason: &str,
    req: &CorrectionRequest,
) -> EngineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance_corrections
            (id, attendance_id, user_id, reason, requested_status, requested_check_in,
             requested_check_out, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(id)
    .bind(attendance_id)
    .bind(user_id)
    .bind(reason)
    .bind(req.requested_status.map(|s| s.to_string()))
    .bind(&req.requested_check_in)
    .bind(&req.requested_check_out)
    .bind(now_rfc3339())
    .execute(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            EngineError::DuplicatePendingCorrection
        } else {
            EngineError::Database(e)
        }
    })?;
    Ok(())
}

pub async fn request_correction(
    db: &SqlitePool,
    user: &User,
    attendance_id: &str,
    req: &CorrectionRequest,
) -> EngineResult<AttendanceCorrection> {
    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(EngineError::Validation("A reason is required".to_string()));
    }

    let record = Attendance::find_by_id(db, attendance_id)
        .await?
        .ok_or(EngineError::NotFound("Attendance record"))?;
    if record.user_id != user.id {
        return Err(EngineError::Forbidden(
            "You can only request corrections for your own attendance".to_string(),
        ));
    }

    for (value, field) in [
        (&req.requested_check_in, "check-in"),
        (&req.requested_check_out, "check-out"),
    ] {
        if let Some(value) = value {
            parse_edit_time(record.date, value, field)?;
        }
    }

    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance_corrections WHERE attendance_id = ? AND status = 'pending'",
    )
    .bind(attendance_id)
    .fetch_one(db)
    .await?;
    if pending > 0 {
        return Err(EngineError::DuplicatePendingCorrection);
    }

    let id = new_id();
    insert_correction(db, &id, &user.id, attendance_id, reason, req).await?;

    info!(correction_id = %id, attendance_id = %attendance_id, user_id = %user.id, "Correction requested");

    let payload = NotificationPayload::new(
        NotificationKind::CorrectionRequested,
        "Attendance Correction Request",
        format!(
            "{} requested a correction for {}: {}",
            user.full_name, record.date, reason
        ),
    )
    .actor(&user.id)
    .related(&id);
    notifications::notify_admins(db, &payload).await?;

    AttendanceCorrection::find_by_id(db, &id)
        .await?
        .ok_or(EngineError::NotFound("Correction request"))
}

/// The amendment approval applies: the reviewer's, else what was requested
fn approval_amendment(correction: &AttendanceCorrection, amend: &AttendanceEdit) -> AttendanceEdit {
    if !amend.is_empty() {
        return amend.clone();
    }
    AttendanceEdit {
        status: correction
            .requested_status
            .as_deref()
            .and_then(|s| s.parse().ok()),
        check_in: correction.requested_check_in.clone(),
        check_out: correction.requested_check_out.clone(),
        date: None,
    }
}

/// Decide a pending correction. The decision, any amendment to the
/// attendance record, and the employee notification commit together.
pub async fn review_correction(
    db: &SqlitePool,
    admin: &User,
    correction_id: &str,
    req: &ReviewCorrectionRequest,
    leave_day_hours: f64,
) -> EngineResult<AttendanceCorrection> {
    if !admin.is_privileged() {
        return Err(EngineError::NotAuthorized);
    }
    if req.status == CorrectionStatus::Pending {
        return Err(EngineError::Validation(
            "Review status must be approved or rejected".to_string(),
        ));
    }

    let correction = AttendanceCorrection::find_by_id(db, correction_id)
        .await?
        .ok_or(EngineError::NotFound("Correction request"))?;
    if correction.status_enum() != CorrectionStatus::Pending {
        return Err(EngineError::AlreadyReviewed);
    }

    let attendance = Attendance::find_by_id(db, &correction.attendance_id)
        .await?
        .ok_or(EngineError::NotFound("Attendance record"))?;

    let resolved = if req.status == CorrectionStatus::Approved {
        let amendment = approval_amendment(&correction, &req.amend);
        if amendment.is_empty() {
            None
        } else {
            Some(resolve_edit(&attendance, &amendment, leave_day_hours)?)
        }
    } else {
        None
    };

    let review_notes = req
        .review_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let mut tx = db.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE attendance_corrections
        SET status = ?, reviewed_by = ?, reviewed_at = ?, review_notes = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(req.status.to_string())
    .bind(&admin.id)
    .bind(now_rfc3339())
    .bind(review_notes)
    .bind(correction_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::AlreadyReviewed);
    }

    if let Some(resolved) = &resolved {
        write_edit(&mut *tx, &attendance.id, resolved).await?;
    }

    let outcome = req.status.to_string();
    let mut message = format!(
        "Your correction request for {} was {}",
        attendance.date, outcome
    );
    if let Some(notes) = review_notes {
        message.push_str(&format!(": {}", notes));
    }
    let payload = NotificationPayload::new(
        NotificationKind::CorrectionReviewed,
        format!("Correction Request {}", capitalize(&outcome)),
        message,
    )
    .actor(&admin.id)
    .related(correction_id);
    notifications::notify_user(&mut *tx, &correction.user_id, &payload).await?;

    tx.commit().await?;

    info!(
        correction_id = %correction_id,
        status = %outcome,
        amended = resolved.is_some(),
        actor = %admin.id,
        "Correction reviewed"
    );

    AttendanceCorrection::find_by_id(db, correction_id)
        .await?
        .ok_or(EngineError::NotFound("Correction request"))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn record(status: AttendanceStatus) -> Attendance {
        let date = day(2026, 10, 15);
        Attendance {
            id: "a1".into(),
            user_id: "u1".into(),
            date,
            check_in: Some(date.and_time(time(9, 0))),
            check_out: Some(date.and_time(time(17, 0))),
            hours: 8.0,
            status: status.to_string(),
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn holiday(name: &str) -> Holiday {
        Holiday {
            id: "h".into(),
            name: name.into(),
            date: day(2026, 10, 15),
            created_at: String::new(),
        }
    }

    fn special() -> SpecialWorkingDay {
        SpecialWorkingDay {
            id: "s".into(),
            date: day(2026, 10, 17),
            reason: "Stocktake".into(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_resolve_weekday_and_weekend() {
        let schedule = WorkSchedule::default();
        assert!(resolve_day(day(2026, 10, 15), &schedule, None, None).is_working_day);

        let saturday = resolve_day(day(2026, 10, 17), &schedule, None, None);
        assert!(!saturday.is_working_day);
        assert_eq!(saturday.reason.as_deref(), Some("Weekend / Off Day"));
    }

    #[test]
    fn test_holiday_overrides_schedule() {
        let schedule = WorkSchedule::default();
        let verdict = resolve_day(day(2026, 10, 15), &schedule, Some(&holiday("Founders Day")), None);
        assert_eq!(verdict, WorkingDay::off("Holiday: Founders Day".into()));
    }

    #[test]
    fn test_special_day_wins_over_everything() {
        let schedule = WorkSchedule::default();
        let verdict = resolve_day(
            day(2026, 10, 17),
            &schedule,
            Some(&holiday("Overlap")),
            Some(&special()),
        );
        assert!(verdict.is_working_day);
        assert_eq!(verdict.reason, None);
    }

    #[test]
    fn test_classify_check_in_by_minute() {
        let start = time(9, 0);
        assert_eq!(classify_check_in(time(8, 45), start), AttendanceStatus::Present);
        assert_eq!(
            classify_check_in(NaiveTime::from_hms_opt(9, 0, 59).unwrap(), start),
            AttendanceStatus::Present
        );
        assert_eq!(classify_check_in(time(9, 1), start), AttendanceStatus::Late);
        assert_eq!(classify_check_in(time(9, 15), start), AttendanceStatus::Late);
    }

    #[test]
    fn test_edit_to_absent_clears_times() {
        let edit = AttendanceEdit {
            status: Some(AttendanceStatus::Absent),
            check_in: Some("08:00".into()),
            check_out: Some("12:00".into()),
            date: None,
        };
        let resolved = resolve_edit(&record(AttendanceStatus::Present), &edit, 8.0).unwrap();
        assert_eq!(resolved.check_in, None);
        assert_eq!(resolved.check_out, None);
        assert_eq!(resolved.hours, 0.0);
    }

    #[test]
    fn test_edit_to_leave_credits_a_day() {
        let edit = AttendanceEdit {
            status: Some(AttendanceStatus::Leave),
            ..Default::default()
        };
        let resolved = resolve_edit(&record(AttendanceStatus::Present), &edit, 8.0).unwrap();
        assert_eq!(resolved.status, AttendanceStatus::Leave);
        assert_eq!(resolved.check_in, None);
        assert_eq!(resolved.hours, 8.0);
    }

    #[test]
    fn test_edit_recomputes_hours() {
        let edit = AttendanceEdit {
            check_out: Some("10:30".into()),
            ..Default::default()
        };
        let resolved = resolve_edit(&record(AttendanceStatus::Late), &edit, 8.0).unwrap();
        assert_eq!(resolved.status, AttendanceStatus::Late);
        assert_eq!(resolved.hours, 1.5);
    }

    #[test]
    fn test_edit_clearing_one_side_zeroes_hours() {
        let edit = AttendanceEdit {
            check_out: Some(String::new()),
            ..Default::default()
        };
        let resolved = resolve_edit(&record(AttendanceStatus::Present), &edit, 8.0).unwrap();
        assert_eq!(resolved.check_out, None);
        assert_eq!(resolved.hours, 0.0);
    }

    #[test]
    fn test_edit_moves_times_with_date() {
        let edit = AttendanceEdit {
            date: Some(day(2026, 10, 14)),
            ..Default::default()
        };
        let resolved = resolve_edit(&record(AttendanceStatus::Present), &edit, 8.0).unwrap();
        assert_eq!(resolved.check_in, Some(day(2026, 10, 14).and_time(time(9, 0))));
        assert_eq!(resolved.hours, 8.0);
    }

    #[test]
    fn test_edit_rejects_bad_times() {
        let edit = AttendanceEdit {
            check_in: Some("noonish".into()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_edit(&record(AttendanceStatus::Present), &edit, 8.0),
            Err(EngineError::Validation(_))
        ));

        let reversed = AttendanceEdit {
            check_in: Some("18:00".into()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_edit(&record(AttendanceStatus::Present), &reversed, 8.0),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_approval_falls_back_to_requested_values() {
        let correction = AttendanceCorrection {
            id: "c1".into(),
            attendance_id: "a1".into(),
            user_id: "u1".into(),
            reason: "Forgot to check out".into(),
            requested_status: Some("present".into()),
            requested_check_in: None,
            requested_check_out: Some("17:30".into()),
            status: "pending".into(),
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            created_at: String::new(),
        };
        let amendment = approval_amendment(&correction, &AttendanceEdit::default());
        assert_eq!(amendment.status, Some(AttendanceStatus::Present));
        assert_eq!(amendment.check_out.as_deref(), Some("17:30"));

        let explicit = AttendanceEdit {
            status: Some(AttendanceStatus::Late),
            ..Default::default()
        };
        assert_eq!(approval_amendment(&correction, &explicit).status, Some(AttendanceStatus::Late));
    }

    async fn pool_with_user() -> (SqlitePool, User) {
        let db = crate::db::init_memory().await.unwrap();
        let user = crate::engine::accounts::create_user(
            &db,
            crate::engine::accounts::NewUser {
                username: "jane".into(),
                email: "jane@example.com".into(),
                password: "password123".into(),
                full_name: "Jane Doe".into(),
                department: None,
                position: None,
                location: None,
                phone: None,
                role: crate::db::UserRole::Employee,
                is_active: true,
            },
        )
        .await
        .unwrap();
        (db, user)
    }

    fn absent_on(date: NaiveDate) -> ResolvedEdit {
        ResolvedEdit {
            date,
            status: AttendanceStatus::Absent,
            check_in: None,
            check_out: None,
            hours: 0.0,
        }
    }

    #[tokio::test]
    async fn test_second_claim_on_a_day_is_already_checked_in() {
        let (db, user) = pool_with_user().await;
        let date = day(2026, 10, 15);

        claim_check_in(&db, &user.id, date.and_time(time(9, 0)), AttendanceStatus::Present)
            .await
            .unwrap();
        let err = claim_check_in(&db, &user.id, date.and_time(time(9, 5)), AttendanceStatus::Late)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCheckedIn));

        let record = Attendance::find_for_day(&db, &user.id, date).await.unwrap().unwrap();
        assert_eq!(record.check_in, Some(date.and_time(time(9, 0))));
        assert_eq!(record.status_enum(), AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn test_claim_takes_over_a_row_without_check_in() {
        let (db, user) = pool_with_user().await;
        let date = day(2026, 10, 15);
        insert_attendance(&db, "pre-marked", &user.id, &absent_on(date), "2026-10-15T07:00:00Z")
            .await
            .unwrap();

        claim_check_in(&db, &user.id, date.and_time(time(9, 20)), AttendanceStatus::Late)
            .await
            .unwrap();

        let record = Attendance::find_for_day(&db, &user.id, date).await.unwrap().unwrap();
        assert_eq!(record.id, "pre-marked");
        assert_eq!(record.status_enum(), AttendanceStatus::Late);
        assert_eq!(record.check_in, Some(date.and_time(time(9, 20))));
    }

    #[tokio::test]
    async fn test_second_row_for_a_day_is_a_conflict() {
        let (db, user) = pool_with_user().await;
        let date = day(2026, 10, 15);
        insert_attendance(&db, "first", &user.id, &absent_on(date), "2026-10-15T07:00:00Z")
            .await
            .unwrap();

        let err = insert_attendance(&db, "second", &user.id, &absent_on(date), "2026-10-15T07:00:00Z")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_only_one_pending_correction_is_stored() {
        let (db, user) = pool_with_user().await;
        insert_attendance(&db, "a1", &user.id, &absent_on(day(2026, 10, 15)), "2026-10-15T07:00:00Z")
            .await
            .unwrap();
        let req = CorrectionRequest {
            reason: "I was on site".into(),
            requested_status: Some(AttendanceStatus::Present),
            requested_check_in: Some("09:00".into()),
            requested_check_out: None,
        };

        insert_correction(&db, "c1", &user.id, "a1", &req.reason, &req).await.unwrap();
        let err = insert_correction(&db, "c2", &user.id, "a1", &req.reason, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicatePendingCorrection));

        // Decided requests no longer block a new one
        sqlx::query("UPDATE attendance_corrections SET status = 'rejected' WHERE id = 'c1'")
            .execute(&db)
            .await
            .unwrap();
        insert_correction(&db, "c3", &user.id, "a1", &req.reason, &req).await.unwrap();
    }
}
