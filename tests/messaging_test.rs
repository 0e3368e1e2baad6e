//! Direct messages, conversations and notification fan-out.

mod common;

use common::*;
use hrdesk::db::{Message, Notification, NotificationKind, ThreadQuery, User};
use hrdesk::engine::{messaging, EngineError};
use hrdesk::notifications::{self, NotificationPayload};

#[tokio::test]
async fn messages_form_a_thread_and_unread_counts() {
    let db = setup().await;
    let jane = employee(&db, "jane", "Jane Doe").await;
    let john = employee(&db, "john", "John Smith").await;

    messaging::send_message(&db, &jane, &john.id, "Lunch at noon?").await.unwrap();
    messaging::send_message(&db, &jane, &john.id, "  Or 12:30  ").await.unwrap();
    let reply = messaging::send_message(&db, &john, &jane.id, "12:30 works").await.unwrap();
    assert!(!reply.is_read);

    let thread = Message::thread(&db, &john.id, &jane.id, &ThreadQuery::default())
        .await
        .unwrap();
    assert_eq!(thread.len(), 3);
    assert_eq!(thread[1].content, "Or 12:30");

    assert_eq!(Message::unread_count(&db, &john.id).await.unwrap(), 2);
    assert_eq!(Message::unread_count(&db, &jane.id).await.unwrap(), 1);

    let marked = messaging::mark_read(&db, &john, &jane.id).await.unwrap();
    assert_eq!(marked, 2);
    assert_eq!(Message::unread_count(&db, &john.id).await.unwrap(), 0);
    // Only messages addressed to the reader are touched
    assert_eq!(Message::unread_count(&db, &jane.id).await.unwrap(), 1);
}

#[tokio::test]
async fn invalid_messages_are_rejected() {
    let db = setup().await;
    let jane = employee(&db, "jane", "Jane Doe").await;
    let john = employee(&db, "john", "John Smith").await;

    let err = messaging::send_message(&db, &jane, &john.id, "   ").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let long = "x".repeat(messaging::MAX_MESSAGE_LENGTH + 1);
    let err = messaging::send_message(&db, &jane, &john.id, &long).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = messaging::send_message(&db, &jane, &jane.id, "hi me").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = messaging::send_message(&db, &jane, "00000000-0000-4000-8000-000000000000", "hello?")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn conversations_include_everyone_else() {
    let db = setup().await;
    let admin = hr_admin(&db).await;
    let jane = employee(&db, "jane", "Jane Doe").await;
    let john = employee(&db, "john", "John Smith").await;

    messaging::send_message(&db, &john, &jane.id, "Morning!").await.unwrap();
    User::touch(&db, &john.id, chrono::Utc::now()).await.unwrap();

    let list = messaging::conversations(&db, &jane, 5).await.unwrap();
    assert_eq!(list.len(), 2);

    assert_eq!(list[0].user.id, john.id);
    assert_eq!(list[0].unread_count, 1);
    assert!(list[0].online);
    assert_eq!(
        list[0].last_message.as_ref().map(|m| m.content.as_str()),
        Some("Morning!")
    );

    assert_eq!(list[1].user.id, admin.id);
    assert!(list[1].last_message.is_none());
    assert!(!list[1].online);
}

#[tokio::test]
async fn fan_out_targets() {
    let db = setup().await;
    let admin = hr_admin(&db).await;
    let jane = employee(&db, "jane", "Jane Doe").await;
    employee(&db, "john", "John Smith").await;

    let payload = NotificationPayload::new(
        NotificationKind::Announcement,
        "Office closed",
        "The office is closed on Friday",
    )
    .actor(&admin.id);
    let delivered = notifications::broadcast(&db, &payload).await.unwrap();
    assert_eq!(delivered, 3);

    let to_admins = notifications::notify_admins(&db, &payload).await.unwrap();
    assert_eq!(to_admins, 1);

    let janes = notifications_for(&db, &jane).await;
    assert_eq!(janes.len(), 1);
    assert_eq!(janes[0].kind, "announcement");
    assert_eq!(janes[0].actor_name.as_deref(), Some("Helen Ross"));

    assert_eq!(Notification::unread_count(&db, &jane.id).await.unwrap(), 1);
    assert!(Notification::mark_read(&db, &jane.id, &janes[0].id).await.unwrap());
    assert_eq!(Notification::unread_count(&db, &jane.id).await.unwrap(), 0);

    // Another user's notification cannot be touched
    let admin_notes = notifications_for(&db, &admin).await;
    assert!(!Notification::delete(&db, &jane.id, &admin_notes[0].id).await.unwrap());
    assert_eq!(Notification::mark_all_read(&db, &admin.id).await.unwrap(), 2);
    assert!(Notification::delete(&db, &admin.id, &admin_notes[0].id).await.unwrap());
}

#[tokio::test]
async fn fanned_out_ids_are_uuids() {
    let db = setup().await;
    let admin = hr_admin(&db).await;
    let jane = employee(&db, "jane", "Jane Doe").await;
    let payload = NotificationPayload::new(NotificationKind::HolidayAdded, "Holiday", "Founders day");

    notifications::broadcast(&db, &payload).await.unwrap();
    notifications::broadcast(&db, &payload).await.unwrap();
    notifications::notify_admins(&db, &payload).await.unwrap();

    let mut ids: Vec<String> = notifications_for(&db, &jane)
        .await
        .into_iter()
        .chain(notifications_for(&db, &admin).await)
        .map(|n| n.id)
        .collect();
    assert_eq!(ids.len(), 5);
    for id in &ids {
        let parsed = uuid::Uuid::parse_str(id).unwrap();
        assert_eq!(parsed.get_version_num(), 4, "{id}");
        assert_eq!(parsed.get_variant(), uuid::Variant::RFC4122, "{id}");
        assert_eq!(&parsed.hyphenated().to_string(), id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}
