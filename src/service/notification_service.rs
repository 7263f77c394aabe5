// service/notification_service.rs
use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use uuid::Uuid;

use crate::{
    db::{db::DBClient, notificationdb::NotificationExt},
    models::{
        notificationmodel::{Notification, NotificationType},
        taskmodel::Task,
        usermodel::User,
    },
    service::{
        error::ServiceError,
        live::{notification_feed, LiveEvent, LiveHub, Topic},
    },
    utils::currency::format_inr,
};

pub const RECENT_NOTIFICATIONS_LIMIT: i64 = 10;

#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
    live: Arc<LiveHub>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>, live: Arc<LiveHub>) -> Self {
        Self { db_client, live }
    }

    /// Tells the poster a buddy took their task.
    pub async fn notify_task_accepted(
        &self,
        task: &Task,
        buddy: &User,
    ) -> Result<Notification, ServiceError> {
        tracing::info!(
            "Task accepted notification: buddy {} accepted task {}",
            buddy.id,
            task.id
        );

        self.store_notification(
            task.poster_id,
            NotificationType::TaskAccepted,
            Some(task.id),
            "Task Accepted!",
            &task_accepted_message(buddy, &task.title),
        )
        .await
    }

    pub async fn notify_payment_requested(
        &self,
        task: &Task,
        buddy: &User,
    ) -> Result<Notification, ServiceError> {
        tracing::info!(
            "Payment requested notification: buddy {} finished task {}",
            buddy.id,
            task.id
        );

        self.store_notification(
            task.poster_id,
            NotificationType::PaymentRequested,
            Some(task.id),
            "Payment Requested",
            &format!(
                "{} marked \"{}\" as done and requested payment.",
                buddy.display_name_or("Your buddy"),
                task.title
            ),
        )
        .await
    }

    pub async fn notify_payment_released(
        &self,
        task: &Task,
        buddy_id: Uuid,
        amount: i64,
    ) -> Result<Notification, ServiceError> {
        tracing::info!(
            "Payment released notification: {} to buddy {} for task {}",
            amount,
            buddy_id,
            task.id
        );

        self.store_notification(
            buddy_id,
            NotificationType::PaymentReleased,
            Some(task.id),
            "Payment Released!",
            &format!(
                "{} has been added to your wallet for \"{}\".",
                format_inr(amount),
                task.title
            ),
        )
        .await
    }

    /// Latest notifications, newest first, with the unread count.
    pub async fn list_recent(&self, user_id: Uuid) -> Result<(Vec<Notification>, i64), ServiceError> {
        let notifications = self
            .db_client
            .get_recent_notifications(user_id, RECENT_NOTIFICATIONS_LIMIT)
            .await?;
        let unread = self.db_client.count_unread_notifications(user_id).await?;
        Ok((notifications, unread))
    }

    pub async fn mark_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Notification, ServiceError> {
        self.db_client
            .mark_notification_read(user_id, notification_id)
            .await?
            .ok_or(ServiceError::NotificationNotFound(notification_id))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        Ok(self.db_client.mark_all_notifications_read(user_id).await?)
    }

    pub async fn subscribe(&self, user_id: Uuid) -> BoxStream<'static, Notification> {
        let rx = self.live.subscribe(Topic::Notifications(user_id)).await;
        notification_feed(rx).boxed()
    }

    async fn store_notification(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        task_id: Option<Uuid>,
        title: &str,
        message: &str,
    ) -> Result<Notification, ServiceError> {
        let notification = self
            .db_client
            .create_notification(user_id, notification_type, task_id, title, message)
            .await?;

        self.live
            .publish(
                Topic::Notifications(user_id),
                LiveEvent::Notification(notification.clone()),
            )
            .await;

        Ok(notification)
    }
}

pub fn task_accepted_message(buddy: &User, task_title: &str) -> String {
    format!(
        "{} has accepted your task: \"{}\"",
        buddy.display_name_or("A buddy"),
        task_title
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::usermodel::sample_user;

    #[test]
    fn test_task_accepted_message() {
        assert_eq!(
            task_accepted_message(&sample_user(Some("Ravi")), "Walk my dog"),
            "Ravi has accepted your task: \"Walk my dog\""
        );
        assert_eq!(
            task_accepted_message(&sample_user(None), "Walk my dog"),
            "A buddy has accepted your task: \"Walk my dog\""
        );
    }
}
