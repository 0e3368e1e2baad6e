//! Database seeders for built-in data
//!
//! Singleton documents and protected lookup rows are created here once at
//! startup, so request handlers can assume they exist.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::LeaveDefaults;

/// Roles that ship with every installation and cannot be deleted
const PROTECTED_ROLES: &[(&str, &str)] = &[
    ("Employee", "Default position for new staff"),
    ("Manager", "Leads a team or department"),
];

/// Seed singletons and built-in rows. Existing rows are left untouched.
pub async fn seed_defaults(pool: &SqlitePool, leave_defaults: &LeaveDefaults) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();

    let schedule = sqlx::query(
        r#"
        INSERT OR IGNORE INTO work_schedule (id, work_days, work_start_time, work_end_time, updated_at)
        VALUES (1, '[1,2,3,4,5]', '09:00', '17:00', ?)
        "#,
    )
    .bind(&now)
    .execute(pool)
    .await?;
    if schedule.rows_affected() > 0 {
        info!("Seeded default work schedule (Mon-Fri 09:00-17:00)");
    }

    let settings = sqlx::query(
        r#"
        INSERT OR IGNORE INTO system_settings
            (id, signup_enabled, default_sick_leave, default_vacation, default_personal_leave, updated_at)
        VALUES (1, 1, ?, ?, ?, ?)
        "#,
    )
    .bind(leave_defaults.sick_leave)
    .bind(leave_defaults.vacation)
    .bind(leave_defaults.personal_leave)
    .bind(&now)
    .execute(pool)
    .await?;
    if settings.rows_affected() > 0 {
        info!(
            sick = leave_defaults.sick_leave,
            vacation = leave_defaults.vacation,
            personal = leave_defaults.personal_leave,
            "Seeded system settings"
        );
    }

    for (name, description) in PROTECTED_ROLES {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO roles (id, name, description, protected, created_at)
            VALUES (?, ?, ?, 1, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    Ok(())
}
