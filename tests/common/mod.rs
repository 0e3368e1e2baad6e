//! Shared fixtures: a seeded in-memory database and a few accounts.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use hrdesk::config::LeaveDefaults;
use hrdesk::db::{self, DbPool, Notification, NotificationQuery, User, UserRole};
use hrdesk::engine::accounts::{self, NewUser};

pub const PASSWORD: &str = "password123";

pub async fn setup() -> DbPool {
    let pool = db::init_memory().await.unwrap();
    db::seed_defaults(&pool, &LeaveDefaults::default()).await.unwrap();
    pool
}

pub async fn create_user(pool: &DbPool, username: &str, full_name: &str, role: UserRole) -> User {
    accounts::create_user(
        pool,
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: PASSWORD.to_string(),
            full_name: full_name.to_string(),
            department: None,
            position: None,
            location: None,
            phone: None,
            role,
            is_active: true,
        },
    )
    .await
    .unwrap()
}

pub async fn employee(pool: &DbPool, username: &str, full_name: &str) -> User {
    create_user(pool, username, full_name, UserRole::Employee).await
}

pub async fn hr_admin(pool: &DbPool) -> User {
    create_user(pool, "hr", "Helen Ross", UserRole::HrAdmin).await
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

/// Notifications delivered to a user, newest first
pub async fn notifications_for(pool: &DbPool, user: &User) -> Vec<hrdesk::db::NotificationWithActor> {
    Notification::list_for_user(pool, &user.id, &NotificationQuery::default())
        .await
        .unwrap()
}
