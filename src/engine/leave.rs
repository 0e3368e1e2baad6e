//! Leave requests, balances and the approval workflow.

use chrono::{Datelike, NaiveDate};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{
    CreateLeaveRequest, Leave, LeaveBalance, LeaveBalanceResponse, LeaveQuery, LeaveStatus,
    LeaveWithUser, NotificationKind, SystemSettings, User,
};
use crate::notifications::{self, NotificationPayload};

use super::{new_id, now_rfc3339, EngineError, EngineResult};

/// Inclusive day count of a date range
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Fetch a balance row, creating it from the current defaults if absent
pub async fn ensure_balance(db: &SqlitePool, user_id: &str, year: i32) -> EngineResult<LeaveBalance> {
    if let Some(balance) = LeaveBalance::find(db, user_id, year).await? {
        return Ok(balance);
    }

    let settings = SystemSettings::load(db).await?;
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO leave_balances
            (id, user_id, year, sick_leave_used, sick_leave_total, vacation_used,
             vacation_total, personal_leave_used, personal_leave_total)
        VALUES (?, ?, ?, 0, ?, 0, ?, 0, ?)
        "#,
    )
    .bind(new_id())
    .bind(user_id)
    .bind(year)
    .bind(settings.default_sick_leave)
    .bind(settings.default_vacation)
    .bind(settings.default_personal_leave)
    .execute(db)
    .await?;

    LeaveBalance::find(db, user_id, year)
        .await?
        .ok_or(EngineError::NotFound("Leave balance"))
}

pub async fn get_balance(db: &SqlitePool, user_id: &str, year: i32) -> EngineResult<LeaveBalanceResponse> {
    Ok(ensure_balance(db, user_id, year).await?.into())
}

pub async fn request_leave(db: &SqlitePool, user: &User, req: &CreateLeaveRequest) -> EngineResult<Leave> {
    let days = inclusive_days(req.start_date, req.end_date);
    if days <= 0 {
        return Err(EngineError::InvalidRange);
    }

    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(EngineError::Validation("A reason is required".to_string()));
    }

    let balance = ensure_balance(db, &user.id, req.start_date.year()).await?;
    if let Some(bucket) = req.leave_type.bucket() {
        let available = balance.bucket(bucket).remaining();
        if days > available {
            return Err(EngineError::InsufficientBalance {
                requested: days,
                available,
            });
        }
    }

    let id = new_id();
    sqlx::query(
        r#"
        INSERT INTO leaves (id, user_id, leave_type, start_date, end_date, days, reason, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(req.leave_type.to_string())
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(days)
    .bind(reason)
    .bind(now_rfc3339())
    .execute(db)
    .await?;

    info!(leave_id = %id, user_id = %user.id, days, leave_type = %req.leave_type, "Leave requested");

    let payload = NotificationPayload::new(
        NotificationKind::LeaveRequested,
        "New Leave Request",
        format!(
            "{} requested {} day(s) of {}",
            user.full_name, days, req.leave_type
        ),
    )
    .actor(&user.id)
    .related(&id);
    notifications::notify_admins(db, &payload).await?;

    Leave::find_by_id(db, &id)
        .await?
        .ok_or(EngineError::NotFound("Leave request"))
}

async fn pending_leave(db: &SqlitePool, actor: &User, id: &str) -> EngineResult<Leave> {
    if !actor.is_privileged() {
        return Err(EngineError::NotAuthorized);
    }
    let leave = Leave::find_by_id(db, id)
        .await?
        .ok_or(EngineError::NotFound("Leave request"))?;
    if leave.status_enum() != LeaveStatus::Pending {
        return Err(EngineError::AlreadyProcessed);
    }
    Ok(leave)
}

/// Approve and deduct from the matching balance bucket in one transaction
pub async fn approve_leave(db: &SqlitePool, admin: &User, id: &str) -> EngineResult<Leave> {
    let leave = pending_leave(db, admin, id).await?;
    let leave_type = leave.type_enum();
    let year = leave.start_date.year();

    if leave_type.bucket().is_some() {
        ensure_balance(db, &leave.user_id, year).await?;
    }

    let mut tx = db.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE leaves SET status = 'approved', approved_by = ?, approval_date = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(&admin.id)
    .bind(now_rfc3339())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::AlreadyProcessed);
    }

    if let Some(bucket) = leave_type.bucket() {
        let column = bucket.used_column();
        let sql = format!(
            "UPDATE leave_balances SET {column} = {column} + ? WHERE user_id = ? AND year = ?"
        );
        sqlx::query(&sql)
            .bind(leave.days)
            .bind(&leave.user_id)
            .bind(year)
            .execute(&mut *tx)
            .await?;
    }

    let payload = NotificationPayload::new(
        NotificationKind::LeaveApproved,
        "Leave Request Approved",
        format!(
            "Your {} request from {} to {} has been approved",
            leave_type, leave.start_date, leave.end_date
        ),
    )
    .actor(&admin.id)
    .related(id);
    notifications::notify_user(&mut *tx, &leave.user_id, &payload).await?;

    tx.commit().await?;

    info!(leave_id = %id, user_id = %leave.user_id, days = leave.days, actor = %admin.id, "Leave approved");

    Leave::find_by_id(db, id)
        .await?
        .ok_or(EngineError::NotFound("Leave request"))
}

pub async fn reject_leave(
    db: &SqlitePool,
    admin: &User,
    id: &str,
    reason: Option<&str>,
) -> EngineResult<Leave> {
    let leave = pending_leave(db, admin, id).await?;
    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("No reason provided");

    let mut tx = db.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE leaves SET status = 'rejected', approved_by = ?, approval_date = ?, rejection_reason = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(&admin.id)
    .bind(now_rfc3339())
    .bind(reason)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::AlreadyProcessed);
    }

    let payload = NotificationPayload::new(
        NotificationKind::LeaveRejected,
        "Leave Request Rejected",
        format!(
            "Your {} request from {} to {} was rejected: {}",
            leave.type_enum(),
            leave.start_date,
            leave.end_date,
            reason
        ),
    )
    .actor(&admin.id)
    .related(id);
    notifications::notify_user(&mut *tx, &leave.user_id, &payload).await?;

    tx.commit().await?;

    info!(leave_id = %id, user_id = %leave.user_id, actor = %admin.id, "Leave rejected");

    Leave::find_by_id(db, id)
        .await?
        .ok_or(EngineError::NotFound("Leave request"))
}

/// Admins see every request, employees only their own
pub async fn list_leaves(db: &SqlitePool, viewer: &User, query: &LeaveQuery) -> EngineResult<Vec<LeaveWithUser>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if !viewer.is_privileged() {
        conditions.push("l.user_id = ?");
        bindings.push(viewer.id.clone());
    }
    if let Some(status) = query.status {
        conditions.push("l.status = ?");
        bindings.push(status.to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        r#"
        SELECT l.*, u.full_name, u.employee_id, u.department
        FROM leaves l
        JOIN users u ON u.id = l.user_id
        {}
        ORDER BY l.created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_clause
    );

    let mut query_builder = sqlx::query_as::<_, LeaveWithUser>(&sql);
    for binding in &bindings {
        query_builder = query_builder.bind(binding);
    }
    Ok(query_builder.bind(limit).bind(offset).fetch_all(db).await?)
}

/// Reset every balance total for `year` to the configured defaults.
/// Used days are kept. Returns the number of balances touched.
pub async fn apply_leave_defaults(db: &SqlitePool, year: i32) -> EngineResult<u64> {
    let settings = SystemSettings::load(db).await?;
    let result = sqlx::query(
        r#"
        UPDATE leave_balances
        SET sick_leave_total = ?, vacation_total = ?, personal_leave_total = ?
        WHERE year = ?
        "#,
    )
    .bind(settings.default_sick_leave)
    .bind(settings.default_vacation)
    .bind(settings.default_personal_leave)
    .bind(year)
    .execute(db)
    .await?;

    info!(year, balances = result.rows_affected(), "Applied leave defaults");
    Ok(result.rows_affected())
}
