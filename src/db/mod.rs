mod models;
mod seeders;

pub use models::*;
pub use seeders::seed_defaults;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("hrdesk.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Fresh in-memory database with the full schema.
///
/// Every pooled connection to `sqlite::memory:` is its own database, so the
/// pool is pinned to a single connection that never expires.
pub async fn init_memory() -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let found: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name=?")
            .bind(table)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Users, org lookups, singletons, calendar overrides
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: Attendance and corrections
    if !table_exists(pool, "attendance_corrections").await? {
        execute_sql(pool, include_str!("../../migrations/002_attendance.sql")).await?;
    }

    // Migration 003: Leave requests and balances
    if !table_exists(pool, "leave_balances").await? {
        execute_sql(pool, include_str!("../../migrations/003_leave.sql")).await?;
    }

    // Migration 004: Notifications and messages
    if !table_exists(pool, "messages").await? {
        execute_sql(pool, include_str!("../../migrations/004_messaging.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}
