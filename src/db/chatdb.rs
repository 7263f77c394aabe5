// db/chatdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodels::*;

#[async_trait]
pub trait ChatExt {
    /// At most one chat per task, even under concurrent calls.
    async fn create_or_get_chat(
        &self,
        task_id: Uuid,
        participant_ids: Vec<Uuid>,
    ) -> Result<Chat, Error>;

    async fn get_chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, Error>;

    async fn get_user_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, Error>;

    async fn send_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        text: String,
    ) -> Result<Message, Error>;

    async fn get_chat_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn create_or_get_chat(
        &self,
        task_id: Uuid,
        participant_ids: Vec<Uuid>,
    ) -> Result<Chat, Error> {
        let created = sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (task_id, participant_ids, last_message_text, last_message_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (task_id) DO NOTHING
            RETURNING id, task_id, participant_ids, last_message_text, last_message_at, created_at
            "#,
        )
        .bind(task_id)
        .bind(participant_ids)
        .bind(CHAT_CREATED_TEXT)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(chat) = created {
            return Ok(chat);
        }

        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, task_id, participant_ids, last_message_text, last_message_at, created_at
            FROM chats
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, Error> {
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, task_id, participant_ids, last_message_text, last_message_at, created_at
            FROM chats
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, Error> {
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, task_id, participant_ids, last_message_text, last_message_at, created_at
            FROM chats
            WHERE $1 = ANY(participant_ids)
            ORDER BY last_message_at DESC NULLS LAST, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn send_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        text: String,
    ) -> Result<Message, Error> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (chat_id, sender_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, chat_id, sender_id, text, created_at
            "#,
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(&text)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE chats
            SET last_message_text = $2, last_message_at = $3
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .bind(&text)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn get_chat_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_id, sender_id, text, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::taskdb::{fixtures, TaskExt};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_concurrent_chat_creation_yields_one_chat(pool: PgPool) {
        let db = DBClient::new(pool);
        let poster = fixtures::user(&db, "poster@example.com", "Poster").await;
        let buddy = fixtures::user(&db, "buddy@example.com", "Buddy").await;
        let task = db.create_task(poster.id, fixtures::new_task(200)).await.unwrap();
        db.accept_task(task.id, buddy.id).await.unwrap().unwrap();

        let participants = vec![poster.id, buddy.id];
        let (a, b) = tokio::join!(
            db.create_or_get_chat(task.id, participants.clone()),
            db.create_or_get_chat(task.id, participants.clone())
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id, b.id);
        assert_eq!(a.last_message_text.as_deref(), Some(CHAT_CREATED_TEXT));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats WHERE task_id = $1")
            .bind(task.id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_messages_come_back_in_send_order(pool: PgPool) {
        let db = DBClient::new(pool);
        let poster = fixtures::user(&db, "poster@example.com", "Poster").await;
        let buddy = fixtures::user(&db, "buddy@example.com", "Buddy").await;
        let task = db.create_task(poster.id, fixtures::new_task(200)).await.unwrap();
        let chat = db
            .create_or_get_chat(task.id, vec![poster.id, buddy.id])
            .await
            .unwrap();

        for (i, sender) in [poster.id, buddy.id, poster.id].into_iter().enumerate() {
            db.send_message(chat.id, sender, format!("message {}", i))
                .await
                .unwrap();
        }

        let texts: Vec<String> = db
            .get_chat_messages(chat.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["message 0", "message 1", "message 2"]);

        let refreshed = db.get_chat_by_id(chat.id).await.unwrap().unwrap();
        assert_eq!(refreshed.last_message_text.as_deref(), Some("message 2"));

        let listed = db.get_user_chats(buddy.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
