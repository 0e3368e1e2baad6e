//! Small shared helpers: filesystem setup and wall-clock arithmetic.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::Path;

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Server wall-clock time. Attendance is recorded in local time.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Parse "HH:mm" (or "HH:mm:ss")
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Parse a clock value for a given day: a full timestamp or a bare "HH:mm".
pub fn parse_clock_on(date: NaiveDate, value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    parse_hhmm(value).map(|time| date.and_time(time))
}

/// Worked hours between two instants: minutes / 60, one decimal, half-up.
pub fn worked_hours(check_in: NaiveDateTime, check_out: NaiveDateTime) -> f64 {
    let minutes = (check_out - check_in).num_seconds() as f64 / 60.0;
    if minutes <= 0.0 {
        return 0.0;
    }
    round_one_decimal(minutes / 60.0)
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_worked_hours_ninety_minutes() {
        assert_eq!(worked_hours(at(9, 0), at(10, 30)), 1.5);
    }

    #[test]
    fn test_worked_hours_rounds_half_up() {
        // 8h03m = 8.05h
        assert_eq!(worked_hours(at(9, 0), at(17, 3)), 8.1);
        // 7h02m = 7.033h
        assert_eq!(worked_hours(at(9, 0), at(16, 2)), 7.0);
    }

    #[test]
    fn test_worked_hours_reversed_pair_is_zero() {
        assert_eq!(worked_hours(at(17, 0), at(9, 0)), 0.0);
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_hhmm("17:00:15"), NaiveTime::from_hms_opt(17, 0, 15));
        assert_eq!(parse_hhmm("25:00"), None);
        assert_eq!(parse_hhmm("nine"), None);
    }

    #[test]
    fn test_parse_clock_on() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(parse_clock_on(day, "09:15"), Some(at(9, 15)));
        assert_eq!(parse_clock_on(day, "2026-10-15T17:45"), Some(at(17, 45)));
        assert_eq!(parse_clock_on(day, "2026-10-15 08:05:00"), Some(at(8, 5)));
        assert_eq!(parse_clock_on(day, "later"), None);
    }
}
