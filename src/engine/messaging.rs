//! Direct messages and the conversation list.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::{Conversation, Message, User, UserSummary};

use super::{new_id, now_rfc3339, EngineError, EngineResult};

pub const MAX_MESSAGE_LENGTH: usize = 5000;

pub async fn send_message(
    db: &SqlitePool,
    sender: &User,
    receiver_id: &str,
    content: &str,
) -> EngineResult<Message> {
    let content = content.trim();
    if content.is_empty() {
        return Err(EngineError::Validation("Message cannot be empty".to_string()));
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(EngineError::Validation(format!(
            "Message cannot exceed {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    if receiver_id == sender.id {
        return Err(EngineError::Validation(
            "You cannot send a message to yourself".to_string(),
        ));
    }
    if User::find_by_id(db, receiver_id).await?.is_none() {
        return Err(EngineError::NotFound("Recipient"));
    }

    let message = Message {
        id: new_id(),
        sender_id: sender.id.clone(),
        receiver_id: receiver_id.to_string(),
        content: content.to_string(),
        is_read: false,
        created_at: now_rfc3339(),
    };

    sqlx::query(
        r#"
        INSERT INTO messages (id, sender_id, receiver_id, content, is_read, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&message.id)
    .bind(&message.sender_id)
    .bind(&message.receiver_id)
    .bind(&message.content)
    .bind(&message.created_at)
    .execute(db)
    .await?;

    debug!(message_id = %message.id, sender = %sender.id, receiver = %receiver_id, "Message sent");
    Ok(message)
}

/// Mark everything `sender_id` sent to `reader` as read
pub async fn mark_read(db: &SqlitePool, reader: &User, sender_id: &str) -> EngineResult<u64> {
    let result = sqlx::query(
        "UPDATE messages SET is_read = 1 WHERE sender_id = ? AND receiver_id = ? AND is_read = 0",
    )
    .bind(sender_id)
    .bind(&reader.id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/// One entry per other user, including people never messaged.
///
/// Ordered by most recent message, then by name for untouched conversations.
pub fn build_conversations(
    viewer_id: &str,
    users: &[User],
    messages: &[Message],
    now: DateTime<Utc>,
    online_window_minutes: i64,
) -> Vec<Conversation> {
    let mut latest: HashMap<&str, &Message> = HashMap::new();
    let mut unread: HashMap<&str, i64> = HashMap::new();

    for message in messages {
        let other = if message.sender_id == viewer_id {
            message.receiver_id.as_str()
        } else {
            message.sender_id.as_str()
        };

        latest
            .entry(other)
            .and_modify(|current| {
                if message.created_at > current.created_at {
                    *current = message;
                }
            })
            .or_insert(message);

        if message.receiver_id == viewer_id && !message.is_read {
            *unread.entry(other).or_insert(0) += 1;
        }
    }

    let mut conversations: Vec<Conversation> = users
        .iter()
        .filter(|u| u.id != viewer_id)
        .map(|u| Conversation {
            user: UserSummary::from(u),
            online: u.is_online(now, online_window_minutes),
            last_message: latest.get(u.id.as_str()).map(|m| (*m).clone()),
            unread_count: unread.get(u.id.as_str()).copied().unwrap_or(0),
        })
        .collect();

    conversations.sort_by(|a, b| {
        let a_at = a.last_message.as_ref().map(|m| m.created_at.as_str());
        let b_at = b.last_message.as_ref().map(|m| m.created_at.as_str());
        b_at.cmp(&a_at)
            .then_with(|| a.user.full_name.cmp(&b.user.full_name))
    });

    conversations
}

pub async fn conversations(
    db: &SqlitePool,
    viewer: &User,
    online_window_minutes: i64,
) -> EngineResult<Vec<Conversation>> {
    let users = User::list_all(db).await?;
    let messages = Message::list_involving(db, &viewer.id).await?;
    Ok(build_conversations(
        &viewer.id,
        &users,
        &messages,
        Utc::now(),
        online_window_minutes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str, last_active: Option<DateTime<Utc>>) -> User {
        User {
            id: id.into(),
            username: id.into(),
            email: format!("{}@example.com", id),
            password_hash: String::new(),
            full_name: name.into(),
            employee_id: format!("EMP-{}", id),
            department: None,
            position: None,
            location: None,
            phone: None,
            role: "employee".into(),
            is_active: true,
            last_active,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn msg(id: &str, from: &str, to: &str, at: &str, is_read: bool) -> Message {
        Message {
            id: id.into(),
            sender_id: from.into(),
            receiver_id: to.into(),
            content: format!("hello from {}", from),
            is_read,
            created_at: at.into(),
        }
    }

    #[test]
    fn test_conversations_group_by_counterpart() {
        let now = Utc::now();
        let users = vec![
            user("me", "Me", None),
            user("ann", "Ann", Some(now - chrono::Duration::minutes(2))),
            user("bob", "Bob", Some(now - chrono::Duration::minutes(30))),
            user("cat", "Cat", None),
        ];
        let messages = vec![
            msg("1", "ann", "me", "2026-10-15T09:00:00+00:00", true),
            msg("2", "me", "ann", "2026-10-15T09:05:00+00:00", false),
            msg("3", "bob", "me", "2026-10-15T10:00:00+00:00", false),
            msg("4", "bob", "me", "2026-10-15T10:01:00+00:00", false),
        ];

        let list = build_conversations("me", &users, &messages, now, 5);
        let order: Vec<&str> = list.iter().map(|c| c.user.id.as_str()).collect();
        assert_eq!(order, vec!["bob", "ann", "cat"]);

        assert_eq!(list[0].unread_count, 2);
        assert_eq!(list[0].last_message.as_ref().unwrap().id, "4");
        assert!(!list[0].online);

        assert_eq!(list[1].unread_count, 0);
        assert_eq!(list[1].last_message.as_ref().unwrap().id, "2");
        assert!(list[1].online);

        assert!(list[2].last_message.is_none());
    }
}
