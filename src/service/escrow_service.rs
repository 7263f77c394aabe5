// services/escrow_service.rs
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, ledgerdb::LedgerExt},
    models::{
        ledgermodel::LedgerEntry,
        taskmodel::{Task, TransitionError},
        usermodel::User,
    },
    service::{
        error::ServiceError,
        live::{LiveEvent, LiveHub, Topic},
        notification_service::NotificationService,
    },
};

pub const SETTLEMENT_XP_BONUS: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementPolicy {
    pub include_tip: bool,
    pub xp_bonus: i32,
}

impl SettlementPolicy {
    pub fn new(include_tip: bool) -> Self {
        Self {
            include_tip,
            xp_bonus: SETTLEMENT_XP_BONUS,
        }
    }
}

/// What a release will write, worked out from the locked task row.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPlan {
    pub task_id: Uuid,
    pub poster_id: Uuid,
    pub buddy_id: Uuid,
    pub amount: i64,
    pub xp_bonus: i32,
}

impl SettlementPlan {
    pub fn for_task(
        task: &Task,
        actor_id: Uuid,
        policy: SettlementPolicy,
    ) -> Result<Self, TransitionError> {
        let buddy_id = task.check_release_payment(actor_id)?;

        Ok(Self {
            task_id: task.id,
            poster_id: task.poster_id,
            buddy_id,
            amount: task.settlement_amount(policy.include_tip),
            xp_bonus: policy.xp_bonus,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub task: Task,
    pub amount: i64,
    pub buddy_balance: i64,
    pub buddy_xp: i32,
    pub release: LedgerEntry,
    pub withdraw: LedgerEntry,
}

#[derive(Debug, Clone)]
pub struct EscrowService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
    live: Arc<LiveHub>,
    policy: SettlementPolicy,
}

impl EscrowService {
    pub fn new(
        db_client: Arc<DBClient>,
        notification_service: Arc<NotificationService>,
        live: Arc<LiveHub>,
        policy: SettlementPolicy,
    ) -> Self {
        Self {
            db_client,
            notification_service,
            live,
            policy,
        }
    }

    /// Poster releases payment for a completed task. Not retried on failure.
    pub async fn release_payment(
        &self,
        task_id: Uuid,
        poster: &User,
    ) -> Result<Settlement, ServiceError> {
        let settlement = match self.db_client.settle_task(task_id, poster.id, self.policy).await {
            Ok(settlement) => settlement,
            Err(e) if e.is_internal() => {
                tracing::error!(
                    "Payment release for task {} by {} failed, nothing was applied: {}",
                    task_id,
                    poster.id,
                    e
                );
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "Payment release for task {} by {} refused: {}",
                    task_id,
                    poster.id,
                    e
                );
                return Err(e);
            }
        };

        tracing::info!(
            "💰 Released {} for task {} to buddy {}",
            settlement.amount,
            task_id,
            settlement.release.user_id
        );

        self.live
            .publish(Topic::Task(task_id), LiveEvent::Task(settlement.task.clone()))
            .await;

        if let Err(e) = self
            .notification_service
            .notify_payment_released(&settlement.task, settlement.release.user_id, settlement.amount)
            .await
        {
            tracing::warn!("Failed to notify buddy about payment for task {}: {}", task_id, e);
        }

        Ok(settlement)
    }
}
