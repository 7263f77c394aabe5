// db/notificationdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::notificationmodel::{Notification, NotificationType};

#[async_trait]
pub trait NotificationExt {
    async fn create_notification(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        task_id: Option<Uuid>,
        title: &str,
        message: &str,
    ) -> Result<Notification, sqlx::Error>;

    async fn get_recent_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error>;

    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;

    /// `None` when the notification does not exist or belongs to someone else.
    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, sqlx::Error>;

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn create_notification(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        task_id: Option<Uuid>,
        title: &str,
        message: &str,
    ) -> Result<Notification, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, message, notification_type, task_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, message, notification_type, task_id, is_read, created_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(notification_type)
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_recent_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, message, notification_type, task_id, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, message, notification_type, task_id, is_read, created_at
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE"#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::taskdb::fixtures;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_only_owner_can_mark_read(pool: PgPool) {
        let db = DBClient::new(pool);
        let owner = fixtures::user(&db, "owner@example.com", "Owner").await;
        let other = fixtures::user(&db, "other@example.com", "Other").await;

        let note = db
            .create_notification(
                owner.id,
                NotificationType::TaskAccepted,
                None,
                "Task Accepted!",
                "A buddy has accepted your task: \"Walk my dog\"",
            )
            .await
            .unwrap();
        assert_eq!(db.count_unread_notifications(owner.id).await.unwrap(), 1);

        assert!(db.mark_notification_read(other.id, note.id).await.unwrap().is_none());
        let read = db.mark_notification_read(owner.id, note.id).await.unwrap().unwrap();
        assert!(read.is_read);
        assert_eq!(db.count_unread_notifications(owner.id).await.unwrap(), 0);
    }
}
