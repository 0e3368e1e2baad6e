//! Org configuration: calendar overrides, schedule, lookup lists.

mod common;

use common::*;
use hrdesk::db::{
    CreateHolidayRequest, CreateLookupRequest, CreateSpecialDayRequest, LookupItem, LookupKind,
    UpdateLookupRequest, UpdateScheduleRequest, WorkSchedule,
};
use hrdesk::engine::{attendance, org, EngineError};

fn holiday(name: &str, d: u32) -> CreateHolidayRequest {
    CreateHolidayRequest {
        name: name.into(),
        date: date(2026, 12, d),
    }
}

fn special_day(d: u32) -> CreateSpecialDayRequest {
    CreateSpecialDayRequest {
        date: date(2026, 12, d),
        reason: "Year-end inventory".into(),
    }
}

#[tokio::test]
async fn holiday_and_special_day_are_mutually_exclusive() {
    let db = setup().await;
    let admin = hr_admin(&db).await;

    org::create_holiday(&db, &admin, &holiday("Christmas", 25)).await.unwrap();
    let err = org::create_special_day(&db, &admin, &special_day(25))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConflictingDayType(_)));

    org::create_special_day(&db, &admin, &special_day(19)).await.unwrap();
    let err = org::create_holiday(&db, &admin, &holiday("Staff party", 19))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConflictingDayType(_)));

    let err = org::create_holiday(&db, &admin, &holiday("Christmas again", 25))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConflictingDayType(_)));
}

#[tokio::test]
async fn calendar_changes_reach_every_user() {
    let db = setup().await;
    let admin = hr_admin(&db).await;
    let jane = employee(&db, "jane", "Jane Doe").await;
    let john = employee(&db, "john", "John Smith").await;

    let created = org::create_holiday(&db, &admin, &holiday("Christmas", 25))
        .await
        .unwrap();

    for user in [&admin, &jane, &john] {
        let notes = notifications_for(&db, user).await;
        assert_eq!(notes.len(), 1, "{} should have one notification", user.username);
        assert_eq!(notes[0].kind, "holiday_added");
        assert_eq!(notes[0].related_id.as_deref(), Some(created.id.as_str()));
    }

    // Deleting does not announce anything
    org::delete_holiday(&db, &created.id).await.unwrap();
    assert_eq!(notifications_for(&db, &jane).await.len(), 1);

    let err = org::delete_holiday(&db, &created.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn schedule_update_changes_lateness_and_broadcasts() {
    let db = setup().await;
    let admin = hr_admin(&db).await;
    let jane = employee(&db, "jane", "Jane Doe").await;

    let schedule = org::update_schedule(
        &db,
        &admin,
        &UpdateScheduleRequest {
            work_days: vec![1, 2, 3, 4, 5, 6],
            work_start_time: "09:30".into(),
            work_end_time: "18:00".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(schedule.work_days, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(WorkSchedule::load(&db).await.unwrap().work_start_time, "09:30");

    let notes = notifications_for(&db, &jane).await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, "schedule_updated");

    // Saturday is now a working day, and 09:15 is on time
    let record = attendance::check_in(&db, &jane, at(2026, 10, 17, 9, 15))
        .await
        .unwrap();
    assert_eq!(record.status, "present");
}

#[tokio::test]
async fn invalid_schedule_is_rejected_without_broadcast() {
    let db = setup().await;
    let admin = hr_admin(&db).await;

    let err = org::update_schedule(
        &db,
        &admin,
        &UpdateScheduleRequest {
            work_days: vec![1, 9],
            work_start_time: "09:00".into(),
            work_end_time: "17:00".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(notifications_for(&db, &admin).await.is_empty());
    assert_eq!(WorkSchedule::load(&db).await.unwrap().work_days, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn protected_roles_cannot_be_deleted() {
    let db = setup().await;

    let roles = LookupItem::list(&db, LookupKind::Role).await.unwrap();
    let employee_role = roles.iter().find(|r| r.name == "Employee").unwrap();
    assert!(employee_role.protected);

    let err = org::delete_lookup(&db, LookupKind::Role, &employee_role.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ProtectedResource(_)));

    let analyst = org::create_lookup(
        &db,
        LookupKind::Role,
        &CreateLookupRequest {
            name: "Analyst".into(),
            description: None,
        },
    )
    .await
    .unwrap();
    assert!(!analyst.protected);
    org::delete_lookup(&db, LookupKind::Role, &analyst.id).await.unwrap();
    assert!(!LookupItem::name_exists(&db, LookupKind::Role, "Analyst").await.unwrap());
}

#[tokio::test]
async fn lookup_names_are_unique_per_list() {
    let db = setup().await;

    let engineering = org::create_lookup(
        &db,
        LookupKind::Department,
        &CreateLookupRequest {
            name: "Engineering".into(),
            description: Some("Builds things".into()),
        },
    )
    .await
    .unwrap();

    let err = org::create_lookup(
        &db,
        LookupKind::Department,
        &CreateLookupRequest {
            name: " Engineering ".into(),
            description: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // Same name in another list is fine
    org::create_lookup(
        &db,
        LookupKind::Zone,
        &CreateLookupRequest {
            name: "Engineering".into(),
            description: None,
        },
    )
    .await
    .unwrap();

    let renamed = org::update_lookup(
        &db,
        LookupKind::Department,
        &engineering.id,
        &UpdateLookupRequest {
            name: Some("Platform Engineering".into()),
            description: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.name, "Platform Engineering");
    assert_eq!(renamed.description.as_deref(), Some("Builds things"));

    let names = LookupItem::names(&db, LookupKind::Department).await.unwrap();
    assert_eq!(names, vec!["Platform Engineering".to_string()]);
}
