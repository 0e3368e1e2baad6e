//! Read-side aggregation for the employee and admin dashboards.
//!
//! Nothing is cached: every figure is recomputed from attendance, leave
//! and user rows on request. The folding itself is pure and lives in the
//! free functions below; the async wrappers only load rows.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::{Attendance, AttendanceStatus, Leave, LeaveBalanceResponse, User, UserSummary};
use crate::utils::round_one_decimal;

use super::{leave, EngineResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub leave: i64,
    pub total_records: i64,
    pub total_hours: f64,
    pub average_hours: f64,
    /// (present + late) / records, as a percentage
    pub attendance_rate: f64,
}

pub fn summarize(records: &[Attendance]) -> PeriodSummary {
    let mut summary = PeriodSummary::default();
    let mut worked_days = 0;

    for record in records {
        match record.status_enum() {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Leave => summary.leave += 1,
        }
        if record.hours > 0.0 {
            worked_days += 1;
        }
        summary.total_hours += record.hours;
    }

    summary.total_records = records.len() as i64;
    summary.total_hours = round_one_decimal(summary.total_hours);
    if worked_days > 0 {
        summary.average_hours = round_one_decimal(summary.total_hours / worked_days as f64);
    }
    if summary.total_records > 0 {
        summary.attendance_rate = round_one_decimal(
            (summary.present + summary.late) as f64 / summary.total_records as f64 * 100.0,
        );
    }
    summary
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDelta {
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub leave: i64,
    pub total_hours: f64,
    pub average_hours: f64,
    pub attendance_rate: f64,
}

/// A period next to the one before it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub current: PeriodSummary,
    pub previous: PeriodSummary,
    pub change: SummaryDelta,
}

pub fn delta(current: &PeriodSummary, previous: &PeriodSummary) -> SummaryDelta {
    SummaryDelta {
        present: current.present - previous.present,
        late: current.late - previous.late,
        absent: current.absent - previous.absent,
        leave: current.leave - previous.leave,
        total_hours: round_one_decimal(current.total_hours - previous.total_hours),
        average_hours: round_one_decimal(current.average_hours - previous.average_hours),
        attendance_rate: round_one_decimal(current.attendance_rate - previous.attendance_rate),
    }
}

/// First and last day of the month containing `date`
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let next_first = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_first.map(|d| d - Duration::days(1)).unwrap_or(first);
    (first, last)
}

pub fn previous_month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (first, _) = month_bounds(date);
    month_bounds(first - Duration::days(1))
}

async fn compare_months(
    db: &SqlitePool,
    user_id: Option<&str>,
    today: NaiveDate,
) -> EngineResult<PeriodComparison> {
    let (from, to) = month_bounds(today);
    let (prev_from, prev_to) = previous_month_bounds(today);

    let (current, previous) = match user_id {
        Some(id) => (
            Attendance::list_between_for_user(db, id, from, to).await?,
            Attendance::list_between_for_user(db, id, prev_from, prev_to).await?,
        ),
        None => (
            Attendance::list_between(db, from, to).await?,
            Attendance::list_between(db, prev_from, prev_to).await?,
        ),
    };

    let current = summarize(&current);
    let previous = summarize(&previous);
    Ok(PeriodComparison {
        from,
        to,
        change: delta(&current, &previous),
        current,
        previous,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub month: PeriodComparison,
    pub today: Option<Attendance>,
    pub leave_balance: LeaveBalanceResponse,
    pub pending_leaves: i64,
}

pub async fn user_stats(db: &SqlitePool, user: &User, today: NaiveDate) -> EngineResult<UserStats> {
    let pending_leaves: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM leaves WHERE user_id = ? AND status = 'pending'")
            .bind(&user.id)
            .fetch_one(db)
            .await?;

    Ok(UserStats {
        month: compare_months(db, Some(&user.id), today).await?,
        today: Attendance::find_for_day(db, &user.id, today).await?,
        leave_balance: leave::get_balance(db, &user.id, today.year()).await?,
        pending_leaves,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityQuery {
    pub days: Option<i64>,
}

impl ActivityQuery {
    /// Inclusive window ending today
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days = self.days.unwrap_or(30).clamp(1, 366);
        (today - Duration::days(days - 1), today)
    }
}

/// One day of the chart series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub leave: i64,
    pub hours: f64,
}

/// Per-day totals for every date in `from..=to`, including empty days
pub fn daily_totals(records: &[Attendance], from: NaiveDate, to: NaiveDate) -> Vec<DailyTotals> {
    let mut by_day: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();
    let mut day = from;
    while day <= to {
        by_day.insert(
            day,
            DailyTotals {
                date: day,
                ..Default::default()
            },
        );
        day += Duration::days(1);
    }

    for record in records {
        if let Some(totals) = by_day.get_mut(&record.date) {
            match record.status_enum() {
                AttendanceStatus::Present => totals.present += 1,
                AttendanceStatus::Late => totals.late += 1,
                AttendanceStatus::Absent => totals.absent += 1,
                AttendanceStatus::Leave => totals.leave += 1,
            }
            totals.hours += record.hours;
        }
    }

    by_day
        .into_values()
        .map(|mut totals| {
            totals.hours = round_one_decimal(totals.hours);
            totals
        })
        .collect()
}

pub async fn user_activity(
    db: &SqlitePool,
    user: &User,
    today: NaiveDate,
    query: &ActivityQuery,
) -> EngineResult<Vec<DailyTotals>> {
    let (from, to) = query.window(today);
    let records = Attendance::list_between_for_user(db, &user.id, from, to).await?;
    Ok(daily_totals(&records, from, to))
}

pub async fn admin_activity(
    db: &SqlitePool,
    today: NaiveDate,
    query: &ActivityQuery,
) -> EngineResult<Vec<DailyTotals>> {
    let (from, to) = query.window(today);
    let records = Attendance::list_between(db, from, to).await?;
    Ok(daily_totals(&records, from, to))
}

/// Active employees with no check-in today and no approved leave covering today
pub fn not_checked_in(employees: &[User], today_records: &[Attendance], on_leave: &[Leave]) -> Vec<UserSummary> {
    let checked_in: HashSet<&str> = today_records
        .iter()
        .filter(|r| r.check_in.is_some())
        .map(|r| r.user_id.as_str())
        .collect();
    let away: HashSet<&str> = on_leave.iter().map(|l| l.user_id.as_str()).collect();

    employees
        .iter()
        .filter(|u| !checked_in.contains(u.id.as_str()) && !away.contains(u.id.as_str()))
        .map(UserSummary::from)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayBreakdown {
    pub date: NaiveDate,
    pub total_employees: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub on_leave: i64,
    pub not_checked_in: i64,
}

pub fn today_breakdown(
    date: NaiveDate,
    employees: &[User],
    today_records: &[Attendance],
    on_leave: &[Leave],
) -> TodayBreakdown {
    let employee_ids: HashSet<&str> = employees.iter().map(|u| u.id.as_str()).collect();
    let mut breakdown = TodayBreakdown {
        date,
        total_employees: employees.len() as i64,
        ..Default::default()
    };

    let mut leave_ids: HashSet<&str> = on_leave
        .iter()
        .map(|l| l.user_id.as_str())
        .filter(|id| employee_ids.contains(id))
        .collect();

    for record in today_records
        .iter()
        .filter(|r| employee_ids.contains(r.user_id.as_str()))
    {
        match record.status_enum() {
            AttendanceStatus::Present => breakdown.present += 1,
            AttendanceStatus::Late => breakdown.late += 1,
            AttendanceStatus::Absent => breakdown.absent += 1,
            AttendanceStatus::Leave => {
                leave_ids.insert(record.user_id.as_str());
            }
        }
    }

    breakdown.on_leave = leave_ids.len() as i64;
    breakdown.not_checked_in = not_checked_in(employees, today_records, on_leave).len() as i64;
    breakdown
}

async fn today_inputs(db: &SqlitePool, today: NaiveDate) -> EngineResult<(Vec<User>, Vec<Attendance>, Vec<Leave>)> {
    Ok((
        User::list_active_employees(db).await?,
        Attendance::list_between(db, today, today).await?,
        Leave::list_active_on(db, today).await?,
    ))
}

pub async fn today_breakdown_for(db: &SqlitePool, today: NaiveDate) -> EngineResult<TodayBreakdown> {
    let (employees, records, on_leave) = today_inputs(db, today).await?;
    Ok(today_breakdown(today, &employees, &records, &on_leave))
}

pub async fn not_checked_in_today(db: &SqlitePool, today: NaiveDate) -> EngineResult<Vec<UserSummary>> {
    let (employees, records, on_leave) = today_inputs(db, today).await?;
    Ok(not_checked_in(&employees, &records, &on_leave))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub today: TodayBreakdown,
    pub month: PeriodComparison,
    pub pending_leaves: i64,
    pub pending_corrections: i64,
    pub pending_activations: i64,
}

pub async fn admin_stats(db: &SqlitePool, today: NaiveDate) -> EngineResult<AdminStats> {
    let pending_leaves: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM leaves WHERE status = 'pending'")
            .fetch_one(db)
            .await?;
    let pending_corrections: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance_corrections WHERE status = 'pending'")
            .fetch_one(db)
            .await?;
    let pending_activations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 0")
            .fetch_one(db)
            .await?;

    Ok(AdminStats {
        today: today_breakdown_for(db, today).await?,
        month: compare_months(db, None, today).await?,
        pending_leaves,
        pending_corrections,
        pending_activations,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopEmployeesQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEmployee {
    pub user: UserSummary,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEmployees {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub most_hours: Vec<RankedEmployee>,
    pub most_attendance: Vec<RankedEmployee>,
    pub fewest_late: Vec<RankedEmployee>,
    pub most_absent: Vec<RankedEmployee>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    attended: i64,
    late: i64,
    absent: i64,
    hours: f64,
}

fn take_ranked<F>(
    employees: &[User],
    tallies: &HashMap<&str, Tally>,
    limit: usize,
    keep: impl Fn(&Tally) -> bool,
    value: F,
    descending: bool,
) -> Vec<RankedEmployee>
where
    F: Fn(&Tally) -> f64,
{
    let mut ranked: Vec<(&User, f64)> = employees
        .iter()
        .filter_map(|u| {
            let tally = tallies.get(u.id.as_str()).copied().unwrap_or_default();
            keep(&tally).then(|| (u, value(&tally)))
        })
        .collect();

    ranked.sort_by(|(a_user, a), (b_user, b)| {
        let by_value = if descending {
            b.total_cmp(a)
        } else {
            a.total_cmp(b)
        };
        by_value.then_with(|| a_user.full_name.cmp(&b_user.full_name))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(user, value)| RankedEmployee {
            user: UserSummary::from(user),
            value: round_one_decimal(value),
        })
        .collect()
}

/// Leaderboards over a window. Ties break on name.
///
/// Fewest-late only considers employees who attended at least once, so an
/// employee with no records does not top it.
pub fn rank_employees(
    employees: &[User],
    records: &[Attendance],
    limit: usize,
    from: NaiveDate,
    to: NaiveDate,
) -> TopEmployees {
    let mut tallies: HashMap<&str, Tally> = HashMap::new();
    for record in records {
        let tally = tallies.entry(record.user_id.as_str()).or_default();
        match record.status_enum() {
            AttendanceStatus::Present => tally.attended += 1,
            AttendanceStatus::Late => {
                tally.attended += 1;
                tally.late += 1;
            }
            AttendanceStatus::Absent => tally.absent += 1,
            AttendanceStatus::Leave => {}
        }
        tally.hours += record.hours;
    }

    TopEmployees {
        from,
        to,
        most_hours: take_ranked(employees, &tallies, limit, |t| t.hours > 0.0, |t| t.hours, true),
        most_attendance: take_ranked(
            employees,
            &tallies,
            limit,
            |t| t.attended > 0,
            |t| t.attended as f64,
            true,
        ),
        fewest_late: take_ranked(
            employees,
            &tallies,
            limit,
            |t| t.attended > 0,
            |t| t.late as f64,
            false,
        ),
        most_absent: take_ranked(
            employees,
            &tallies,
            limit,
            |t| t.absent > 0,
            |t| t.absent as f64,
            true,
        ),
    }
}

pub async fn top_employees(
    db: &SqlitePool,
    today: NaiveDate,
    query: &TopEmployeesQuery,
) -> EngineResult<TopEmployees> {
    let (month_start, _) = month_bounds(today);
    let from = query.from.unwrap_or(month_start);
    let to = query.to.unwrap_or(today);
    if to < from {
        return Err(super::EngineError::InvalidRange);
    }
    let limit = query.limit.unwrap_or(5).clamp(1, 50);

    let employees = User::list_active_employees(db).await?;
    let records = Attendance::list_between(db, from, to).await?;
    Ok(rank_employees(&employees, &records, limit, from, to))
}
