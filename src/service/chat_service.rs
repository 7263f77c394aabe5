// service/chat_service.rs
use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use uuid::Uuid;

use crate::{
    db::{chatdb::ChatExt, db::DBClient, taskdb::TaskExt},
    models::chatmodels::{Chat, Message, MAX_MESSAGE_LENGTH},
    service::{
        error::ServiceError,
        live::{message_snapshots, LiveEvent, LiveHub, Topic},
    },
};

#[derive(Debug, Clone)]
pub struct ChatService {
    db_client: Arc<DBClient>,
    live: Arc<LiveHub>,
}

impl ChatService {
    pub fn new(db_client: Arc<DBClient>, live: Arc<LiveHub>) -> Self {
        Self { db_client, live }
    }

    /// Chat for a task, created on first use by the poster or the buddy.
    pub async fn open_chat(&self, task_id: Uuid, actor_id: Uuid) -> Result<Chat, ServiceError> {
        let task = self
            .db_client
            .get_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        if !task.is_participant(actor_id) {
            return Err(ServiceError::NotTaskParticipant);
        }

        let buddy_id = task.buddy_id.ok_or_else(|| {
            ServiceError::Validation("Chat opens once a buddy has accepted the task".to_string())
        })?;

        let chat = self
            .db_client
            .create_or_get_chat(task.id, vec![task.poster_id, buddy_id])
            .await?;

        Ok(chat)
    }

    pub async fn list_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, ServiceError> {
        Ok(self.db_client.get_user_chats(user_id).await?)
    }

    pub async fn get_chat(&self, chat_id: Uuid, actor_id: Uuid) -> Result<Chat, ServiceError> {
        let chat = self
            .db_client
            .get_chat_by_id(chat_id)
            .await?
            .ok_or(ServiceError::ChatNotFound(chat_id))?;

        if !chat.includes(actor_id) {
            return Err(ServiceError::NotTaskParticipant);
        }

        Ok(chat)
    }

    pub async fn list_messages(
        &self,
        chat_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Vec<Message>, ServiceError> {
        self.get_chat(chat_id, actor_id).await?;
        Ok(self.db_client.get_chat_messages(chat_id).await?)
    }

    pub async fn send_message(
        &self,
        chat_id: Uuid,
        actor_id: Uuid,
        text: &str,
    ) -> Result<Message, ServiceError> {
        let text = normalize_message_text(text)?;
        self.get_chat(chat_id, actor_id).await?;

        let message = self.db_client.send_message(chat_id, actor_id, text).await?;

        self.live
            .publish(Topic::Chat(chat_id), LiveEvent::Message(message.clone()))
            .await;

        Ok(message)
    }

    /// Snapshot stream of the chat's messages. Subscribes before reading the
    /// history so nothing sent in between is missed.
    pub async fn subscribe(
        &self,
        chat_id: Uuid,
        actor_id: Uuid,
    ) -> Result<BoxStream<'static, Vec<Message>>, ServiceError> {
        self.get_chat(chat_id, actor_id).await?;

        let rx = self.live.subscribe(Topic::Chat(chat_id)).await;
        let history = self.db_client.get_chat_messages(chat_id).await?;

        Ok(message_snapshots(history, rx).boxed())
    }
}

pub fn normalize_message_text(text: &str) -> Result<String, ServiceError> {
    let text = text.trim();

    if text.is_empty() {
        return Err(ServiceError::Validation("Message cannot be empty".to_string()));
    }

    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Message must not be more than {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_is_trimmed() {
        assert_eq!(normalize_message_text("  on my way  ").unwrap(), "on my way");
    }

    #[test]
    fn test_message_text_bounds() {
        assert!(matches!(
            normalize_message_text("   "),
            Err(ServiceError::Validation(_))
        ));
        assert!(normalize_message_text(&"a".repeat(MAX_MESSAGE_LENGTH)).is_ok());
        assert!(matches!(
            normalize_message_text(&"a".repeat(MAX_MESSAGE_LENGTH + 1)),
            Err(ServiceError::Validation(_))
        ));
    }
}
