// db/taskdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::taskmodel::{NewTask, Task, TaskCategory};

#[async_trait]
pub trait TaskExt {
    async fn create_task(&self, poster_id: Uuid, task: NewTask) -> Result<Task, sqlx::Error>;

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, sqlx::Error>;

    /// Open and assigned tasks, newest first.
    async fn get_browsable_tasks(
        &self,
        category: Option<TaskCategory>,
    ) -> Result<Vec<Task>, sqlx::Error>;

    async fn get_completed_tasks_for_buddy(&self, buddy_id: Uuid)
        -> Result<Vec<Task>, sqlx::Error>;

    async fn get_paid_tasks_for_buddy(
        &self,
        buddy_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Task>, sqlx::Error>;

    /// Compare-and-swap `open -> assigned`. `None` when someone else got there first.
    async fn accept_task(&self, task_id: Uuid, buddy_id: Uuid)
        -> Result<Option<Task>, sqlx::Error>;

    /// Compare-and-swap `assigned -> completed` for the assigned buddy.
    async fn mark_task_completed(
        &self,
        task_id: Uuid,
        buddy_id: Uuid,
    ) -> Result<Option<Task>, sqlx::Error>;
}

#[async_trait]
impl TaskExt for DBClient {
    async fn create_task(&self, poster_id: Uuid, task: NewTask) -> Result<Task, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                title, description, category, budget, tip,
                location, duration, payment_mode, poster_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, title, description, category, budget, tip, location, duration,
                      payment_mode, poster_id, buddy_id, status, created_at, updated_at
            "#,
        )
        .bind(task.title)
        .bind(task.description)
        .bind(task.category)
        .bind(task.budget)
        .bind(task.tip)
        .bind(task.location)
        .bind(task.duration)
        .bind(task.payment_mode)
        .bind(poster_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, category, budget, tip, location, duration,
                   payment_mode, poster_id, buddy_id, status, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_browsable_tasks(
        &self,
        category: Option<TaskCategory>,
    ) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, category, budget, tip, location, duration,
                   payment_mode, poster_id, buddy_id, status, created_at, updated_at
            FROM tasks
            WHERE status IN ('open', 'assigned')
              AND ($1::task_category IS NULL OR category = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_completed_tasks_for_buddy(
        &self,
        buddy_id: Uuid,
    ) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, category, budget, tip, location, duration,
                   payment_mode, poster_id, buddy_id, status, created_at, updated_at
            FROM tasks
            WHERE buddy_id = $1 AND status IN ('completed', 'paid')
            ORDER BY updated_at DESC
            "#,
        )
        .bind(buddy_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_paid_tasks_for_buddy(
        &self,
        buddy_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, category, budget, tip, location, duration,
                   payment_mode, poster_id, buddy_id, status, created_at, updated_at
            FROM tasks
            WHERE buddy_id = $1 AND status = 'paid'
            ORDER BY updated_at DESC
            LIMIT $2
            "#,
        )
        .bind(buddy_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn accept_task(
        &self,
        task_id: Uuid,
        buddy_id: Uuid,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'assigned', buddy_id = $2, updated_at = NOW()
            WHERE id = $1
              AND status = 'open'
              AND buddy_id IS NULL
              AND poster_id <> $2
            RETURNING id, title, description, category, budget, tip, location, duration,
                      payment_mode, poster_id, buddy_id, status, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(buddy_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_task_completed(
        &self,
        task_id: Uuid,
        buddy_id: Uuid,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'completed', updated_at = NOW()
            WHERE id = $1 AND status = 'assigned' AND buddy_id = $2
            RETURNING id, title, description, category, budget, tip, location, duration,
                      payment_mode, poster_id, buddy_id, status, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(buddy_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::{
        db::userdb::UserExt,
        models::{
            taskmodel::{PaymentMode, TaskCategory},
            usermodel::User,
        },
    };

    pub async fn user(db: &DBClient, email: &str, name: &str) -> User {
        db.save_user(Some(name.to_string()), email, "not-a-real-hash")
            .await
            .unwrap()
    }

    pub fn new_task(budget: i64) -> NewTask {
        NewTask {
            title: "Set up my new router".to_string(),
            description: "Need help configuring a new wifi router and two laptops.".to_string(),
            category: TaskCategory::Tech,
            budget,
            tip: 0,
            location: "Koramangala".to_string(),
            duration: "1 hour".to_string(),
            payment_mode: PaymentMode::Online,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::models::taskmodel::{PaymentMode, TaskStatus};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_create_read_and_accept(pool: PgPool) {
        let db = DBClient::new(pool);
        let poster = user(&db, "poster@example.com", "Poster").await;
        let buddy = user(&db, "buddy@example.com", "Buddy").await;

        let created = db.create_task(poster.id, new_task(500)).await.unwrap();
        let read = db.get_task(created.id).await.unwrap().unwrap();
        assert_eq!(read.budget, 500);
        assert_eq!(read.category, TaskCategory::Tech);
        assert_eq!(read.payment_mode, PaymentMode::Online);
        assert_eq!(read.status, TaskStatus::Open);
        assert_eq!(read.buddy_id, None);

        let accepted = db.accept_task(created.id, buddy.id).await.unwrap().unwrap();
        assert_eq!(accepted.status, TaskStatus::Assigned);
        assert_eq!(accepted.buddy_id, Some(buddy.id));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_first_acceptance_wins(pool: PgPool) {
        let db = DBClient::new(pool);
        let poster = user(&db, "poster@example.com", "Poster").await;
        let first = user(&db, "first@example.com", "First").await;
        let second = user(&db, "second@example.com", "Second").await;
        let task = db.create_task(poster.id, new_task(300)).await.unwrap();

        let (a, b) = tokio::join!(
            db.accept_task(task.id, first.id),
            db.accept_task(task.id, second.id)
        );
        let winners = [a.unwrap(), b.unwrap()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        assert_eq!(winners.len(), 1);

        let stored = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.buddy_id, winners[0].buddy_id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_poster_cannot_accept_and_only_buddy_completes(pool: PgPool) {
        let db = DBClient::new(pool);
        let poster = user(&db, "poster@example.com", "Poster").await;
        let buddy = user(&db, "buddy@example.com", "Buddy").await;
        let task = db.create_task(poster.id, new_task(300)).await.unwrap();

        assert!(db.accept_task(task.id, poster.id).await.unwrap().is_none());
        db.accept_task(task.id, buddy.id).await.unwrap().unwrap();

        assert!(db.mark_task_completed(task.id, poster.id).await.unwrap().is_none());
        let done = db.mark_task_completed(task.id, buddy.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Completed);

        let completed = db.get_completed_tasks_for_buddy(buddy.id).await.unwrap();
        assert_eq!(completed.len(), 1);
    }
}
