// db/ledgerdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    models::{
        ledgermodel::{LedgerEntry, LedgerEntryType},
        taskmodel::Task,
        usermodel::User,
    },
    service::{
        error::ServiceError,
        escrow_service::{Settlement, SettlementPlan, SettlementPolicy},
    },
};

#[async_trait]
pub trait LedgerExt {
    /// Pays the buddy of a completed task in one transaction: balance and xp
    /// credit, task flipped to paid, release and withdraw entries appended.
    /// Nothing is written when any step fails.
    async fn settle_task(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        policy: SettlementPolicy,
    ) -> Result<Settlement, ServiceError>;

    async fn get_user_transactions(&self, user_id: Uuid) -> Result<Vec<LedgerEntry>, sqlx::Error>;
}

#[async_trait]
impl LedgerExt for DBClient {
    async fn settle_task(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        policy: SettlementPolicy,
    ) -> Result<Settlement, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, category, budget, tip, location, duration,
                   payment_mode, poster_id, buddy_id, status, created_at, updated_at
            FROM tasks
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::TaskNotFound(task_id))?;

        let plan = SettlementPlan::for_task(&task, actor_id, policy)?;

        let buddy_exists = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT id FROM users WHERE id = $1 FOR UPDATE"#,
        )
        .bind(plan.buddy_id)
        .fetch_optional(&mut *tx)
        .await?;

        if buddy_exists.is_none() {
            return Err(ServiceError::UserNotFound(plan.buddy_id));
        }

        let buddy = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET wallet_balance = wallet_balance + $2,
                xp = xp + $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone_number, password, google_id, photo_url,
                      role, wallet_balance, xp, verification_status, skills, location,
                      birth_year, app_language, profile_completed, created_at, updated_at
            "#,
        )
        .bind(plan.buddy_id)
        .bind(plan.amount)
        .bind(plan.xp_bonus)
        .fetch_one(&mut *tx)
        .await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'paid', updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, category, budget, tip, location, duration,
                      payment_mode, poster_id, buddy_id, status, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        let release = sqlx::query_as::<_, LedgerEntry>(
            r#"
            INSERT INTO transactions (user_id, task_id, entry_type, amount, status)
            VALUES ($1, $2, $3, $4, 'success')
            RETURNING id, user_id, task_id, entry_type, amount, status, created_at
            "#,
        )
        .bind(plan.buddy_id)
        .bind(task_id)
        .bind(LedgerEntryType::Release)
        .bind(plan.amount)
        .fetch_one(&mut *tx)
        .await?;

        let withdraw = sqlx::query_as::<_, LedgerEntry>(
            r#"
            INSERT INTO transactions (user_id, task_id, entry_type, amount, status)
            VALUES ($1, $2, $3, $4, 'success')
            RETURNING id, user_id, task_id, entry_type, amount, status, created_at
            "#,
        )
        .bind(plan.poster_id)
        .bind(task_id)
        .bind(LedgerEntryType::Withdraw)
        .bind(plan.amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Settlement {
            task,
            amount: plan.amount,
            buddy_balance: buddy.wallet_balance,
            buddy_xp: buddy.xp,
            release,
            withdraw,
        })
    }

    async fn get_user_transactions(&self, user_id: Uuid) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, user_id, task_id, entry_type, amount, status, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            taskdb::{fixtures, TaskExt},
            userdb::UserExt,
        },
        models::taskmodel::TaskStatus,
        service::escrow_service::SETTLEMENT_XP_BONUS,
    };
    use sqlx::PgPool;

    async fn task_entries(db: &DBClient, task_id: Uuid) -> Vec<LedgerEntry> {
        sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, user_id, task_id, entry_type, amount, status, created_at
            FROM transactions
            WHERE task_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&db.pool)
        .await
        .unwrap()
    }

    const POLICY: SettlementPolicy = SettlementPolicy {
        include_tip: false,
        xp_bonus: SETTLEMENT_XP_BONUS,
    };

    async fn completed_task(db: &DBClient) -> (Uuid, Uuid, Uuid) {
        let poster = fixtures::user(db, "poster@example.com", "Poster").await;
        let buddy = fixtures::user(db, "buddy@example.com", "Buddy").await;
        let mut new_task = fixtures::new_task(500);
        new_task.tip = 30;
        let task = db.create_task(poster.id, new_task).await.unwrap();
        db.accept_task(task.id, buddy.id).await.unwrap().unwrap();
        db.mark_task_completed(task.id, buddy.id).await.unwrap().unwrap();
        (task.id, poster.id, buddy.id)
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_settlement_pays_buddy_and_writes_two_entries(pool: PgPool) {
        let db = DBClient::new(pool);
        let (task_id, poster_id, buddy_id) = completed_task(&db).await;

        let settlement = db.settle_task(task_id, poster_id, POLICY).await.unwrap();
        assert_eq!(settlement.task.status, TaskStatus::Paid);
        assert_eq!(settlement.amount, 500);
        assert_eq!(settlement.buddy_balance, 500);
        assert_eq!(settlement.buddy_xp, SETTLEMENT_XP_BONUS);

        let entries = task_entries(&db, task_id).await;
        assert_eq!(entries.len(), 2);
        let release = entries
            .iter()
            .find(|e| e.entry_type == LedgerEntryType::Release)
            .unwrap();
        let withdraw = entries
            .iter()
            .find(|e| e.entry_type == LedgerEntryType::Withdraw)
            .unwrap();
        assert_eq!((release.user_id, release.amount), (buddy_id, 500));
        assert_eq!((withdraw.user_id, withdraw.amount), (poster_id, 500));

        let poster = db.get_user(Some(poster_id), None, None, None).await.unwrap().unwrap();
        assert_eq!(poster.wallet_balance, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_settling_a_paid_task_writes_nothing(pool: PgPool) {
        let db = DBClient::new(pool);
        let (task_id, poster_id, buddy_id) = completed_task(&db).await;
        db.settle_task(task_id, poster_id, POLICY).await.unwrap();

        let again = db.settle_task(task_id, poster_id, POLICY).await;
        assert!(matches!(again, Err(ServiceError::AlreadySettled)));

        let entries = task_entries(&db, task_id).await;
        assert_eq!(entries.len(), 2);
        let buddy = db.get_user(Some(buddy_id), None, None, None).await.unwrap().unwrap();
        assert_eq!(buddy.wallet_balance, 500);
        assert_eq!(buddy.xp, SETTLEMENT_XP_BONUS);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_concurrent_release_settles_once(pool: PgPool) {
        let db = DBClient::new(pool);
        let (task_id, poster_id, buddy_id) = completed_task(&db).await;

        let (a, b) = tokio::join!(
            db.settle_task(task_id, poster_id, POLICY),
            db.settle_task(task_id, poster_id, POLICY)
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

        let buddy = db.get_user(Some(buddy_id), None, None, None).await.unwrap().unwrap();
        assert_eq!(buddy.wallet_balance, 500);
        assert_eq!(task_entries(&db, task_id).await.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_buddy_cannot_release_and_nothing_changes(pool: PgPool) {
        let db = DBClient::new(pool);
        let (task_id, _poster_id, buddy_id) = completed_task(&db).await;

        let result = db.settle_task(task_id, buddy_id, POLICY).await;
        assert!(matches!(result, Err(ServiceError::NotPermitted(_))));

        let task = db.get_task(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task_entries(&db, task_id).await.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_tip_included_when_enabled(pool: PgPool) {
        let db = DBClient::new(pool);
        let (task_id, poster_id, _buddy_id) = completed_task(&db).await;
        let policy = SettlementPolicy {
            include_tip: true,
            ..POLICY
        };

        let settlement = db.settle_task(task_id, poster_id, policy).await.unwrap();
        assert_eq!(settlement.amount, 530);
        assert_eq!(settlement.release.amount, 530);
    }
}
