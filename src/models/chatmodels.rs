// models/chatmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CHAT_CREATED_TEXT: &str = "Chat created";
pub const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(Debug, Serialize, Clone, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub task_id: Uuid,
    pub participant_ids: Vec<Uuid>,
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn includes(&self, user_id: Uuid) -> bool {
        self.participant_ids.contains(&user_id)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Inserts `message` keeping (created_at, id) order. Returns false if it was
/// already present.
pub fn insert_ordered(messages: &mut Vec<Message>, message: Message) -> bool {
    if messages.iter().any(|m| m.id == message.id) {
        return false;
    }
    let key = (message.created_at, message.id);
    let position = messages.partition_point(|m| (m.created_at, m.id) <= key);
    messages.insert(position, message);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message_at(chat_id: Uuid, offset_secs: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id,
            sender_id: Uuid::new_v4(),
            text: format!("message at {}", offset_secs),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_insert_ordered_keeps_timestamp_order() {
        let chat_id = Uuid::new_v4();
        let first = message_at(chat_id, 0);
        let third = message_at(chat_id, 20);
        let second = message_at(chat_id, 10);

        let mut messages = vec![first.clone(), third.clone()];
        assert!(insert_ordered(&mut messages, second.clone()));
        assert_eq!(messages, vec![first, second, third]);
    }

    #[test]
    fn test_insert_ordered_skips_duplicates() {
        let chat_id = Uuid::new_v4();
        let message = message_at(chat_id, 0);
        let mut messages = vec![message.clone()];
        assert!(!insert_ordered(&mut messages, message));
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_chat_includes_participants_only() {
        let poster = Uuid::new_v4();
        let buddy = Uuid::new_v4();
        let chat = Chat {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            participant_ids: vec![poster, buddy],
            last_message_text: Some(CHAT_CREATED_TEXT.to_string()),
            last_message_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        assert!(chat.includes(poster));
        assert!(chat.includes(buddy));
        assert!(!chat.includes(Uuid::new_v4()));
    }
}
