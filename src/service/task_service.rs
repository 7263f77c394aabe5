// service/task_service.rs
use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use uuid::Uuid;

use crate::{
    db::{db::DBClient, taskdb::TaskExt},
    models::{
        taskmodel::{NewTask, Task, TaskCategory, TaskStatus},
        usermodel::User,
    },
    service::{
        error::ServiceError,
        live::{task_feed, LiveEvent, LiveHub, Topic},
        notification_service::NotificationService,
    },
};

#[derive(Debug, Clone)]
pub struct TaskService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
    live: Arc<LiveHub>,
}

impl TaskService {
    pub fn new(
        db_client: Arc<DBClient>,
        notification_service: Arc<NotificationService>,
        live: Arc<LiveHub>,
    ) -> Self {
        Self {
            db_client,
            notification_service,
            live,
        }
    }

    pub async fn create_task(&self, poster: &User, new_task: NewTask) -> Result<Task, ServiceError> {
        let task = self.db_client.create_task(poster.id, new_task).await?;
        tracing::info!("Task {} posted by {}", task.id, poster.id);
        Ok(task)
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<Task, ServiceError> {
        self.db_client
            .get_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))
    }

    /// The viewer's accepted tasks first, then everything still open.
    pub async fn browse_tasks(
        &self,
        viewer_id: Uuid,
        category: Option<TaskCategory>,
    ) -> Result<Vec<Task>, ServiceError> {
        let tasks = self.db_client.get_browsable_tasks(category).await?;
        Ok(arrange_feed(tasks, viewer_id))
    }

    pub async fn completed_tasks_for(&self, buddy_id: Uuid) -> Result<Vec<Task>, ServiceError> {
        Ok(self.db_client.get_completed_tasks_for_buddy(buddy_id).await?)
    }

    pub async fn accept_task(&self, task_id: Uuid, buddy: &User) -> Result<Task, ServiceError> {
        let task = self.get_task(task_id).await?;
        task.check_accept(buddy.id)?;

        let accepted = match self.db_client.accept_task(task_id, buddy.id).await? {
            Some(task) => task,
            None => {
                tracing::info!("Buddy {} lost the race to accept task {}", buddy.id, task_id);
                return Err(ServiceError::AlreadyAssigned);
            }
        };

        tracing::info!("Task {} accepted by {}", task_id, buddy.id);
        self.publish(&accepted).await;

        if let Err(e) = self
            .notification_service
            .notify_task_accepted(&accepted, buddy)
            .await
        {
            tracing::warn!("Failed to notify poster of task {}: {}", task_id, e);
        }

        Ok(accepted)
    }

    pub async fn request_payment(&self, task_id: Uuid, buddy: &User) -> Result<Task, ServiceError> {
        let task = self.get_task(task_id).await?;
        task.check_request_payment(buddy.id)?;

        let completed = match self.db_client.mark_task_completed(task_id, buddy.id).await? {
            Some(task) => task,
            None => {
                // Re-read so the caller sees what actually changed underneath.
                let current = self.get_task(task_id).await?;
                current.check_request_payment(buddy.id)?;
                return Err(ServiceError::InvalidTaskStatus {
                    expected: TaskStatus::Assigned,
                    actual: current.status,
                });
            }
        };

        tracing::info!("Payment requested for task {} by {}", task_id, buddy.id);
        self.publish(&completed).await;

        if let Err(e) = self
            .notification_service
            .notify_payment_requested(&completed, buddy)
            .await
        {
            tracing::warn!("Failed to notify poster of task {}: {}", task_id, e);
        }

        Ok(completed)
    }

    /// Current task, then every transition. Subscribes before the read so no
    /// update in between is lost.
    pub async fn subscribe(&self, task_id: Uuid) -> Result<BoxStream<'static, Task>, ServiceError> {
        let rx = self.live.subscribe(Topic::Task(task_id)).await;
        let task = self.get_task(task_id).await?;
        Ok(task_feed(task, rx).boxed())
    }

    async fn publish(&self, task: &Task) {
        self.live
            .publish(Topic::Task(task.id), LiveEvent::Task(task.clone()))
            .await;
    }
}

pub fn arrange_feed(tasks: Vec<Task>, viewer_id: Uuid) -> Vec<Task> {
    let (mine, rest): (Vec<Task>, Vec<Task>) = tasks
        .into_iter()
        .filter(|task| task.status.is_browsable())
        .partition(|task| task.buddy_id == Some(viewer_id));

    mine.into_iter()
        .chain(rest.into_iter().filter(|task| task.status == TaskStatus::Open))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::taskmodel::sample_task;

    #[test]
    fn test_feed_shows_my_accepted_tasks_then_open_ones() {
        let viewer = Uuid::new_v4();
        let poster = Uuid::new_v4();

        let open = sample_task(poster);
        let mut mine = sample_task(poster);
        mine.buddy_id = Some(viewer);
        mine.status = TaskStatus::Assigned;
        let mut someone_elses = sample_task(poster);
        someone_elses.buddy_id = Some(Uuid::new_v4());
        someone_elses.status = TaskStatus::Assigned;
        let mut paid = sample_task(poster);
        paid.buddy_id = Some(viewer);
        paid.status = TaskStatus::Paid;

        let feed = arrange_feed(
            vec![open.clone(), someone_elses, mine.clone(), paid],
            viewer,
        );
        let ids: Vec<Uuid> = feed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![mine.id, open.id]);
    }

    #[test]
    fn test_feed_keeps_my_own_open_posts() {
        let viewer = Uuid::new_v4();
        let own = sample_task(viewer);
        let feed = arrange_feed(vec![own.clone()], viewer);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, own.id);
    }
}
