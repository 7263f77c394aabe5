use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "task_category", rename_all = "lowercase")]
pub enum TaskCategory {
    Household,
    Tech,
    Cleaning,
    Delivery,
    Tutoring,
    Other,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 6] = [
        TaskCategory::Household,
        TaskCategory::Tech,
        TaskCategory::Cleaning,
        TaskCategory::Delivery,
        TaskCategory::Tutoring,
        TaskCategory::Other,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            TaskCategory::Household => "Household",
            TaskCategory::Tech => "Tech",
            TaskCategory::Cleaning => "Cleaning",
            TaskCategory::Delivery => "Delivery",
            TaskCategory::Tutoring => "Tutoring",
            TaskCategory::Other => "Other",
        }
    }

    /// Case-insensitive lookup by label.
    pub fn from_label(label: &str) -> Option<TaskCategory> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.to_str().eq_ignore_ascii_case(label))
    }

    /// Unknown labels land in `Other`.
    pub fn normalize(label: &str) -> TaskCategory {
        Self::from_label(label).unwrap_or(TaskCategory::Other)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
pub enum TaskStatus {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "assigned")]
    Assigned,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "paid")]
    Paid,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Open,
        TaskStatus::Assigned,
        TaskStatus::Completed,
        TaskStatus::Paid,
    ];

    pub fn next(self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Open => Some(TaskStatus::Assigned),
            TaskStatus::Assigned => Some(TaskStatus::Completed),
            TaskStatus::Completed => Some(TaskStatus::Paid),
            TaskStatus::Paid => None,
        }
    }

    /// Forward by exactly one step; there is no rollback or cancellation.
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        self.next() == Some(to)
    }

    /// Shown on the browse feed.
    pub fn is_browsable(self) -> bool {
        matches!(self, TaskStatus::Open | TaskStatus::Assigned)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Online,
    Cash,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub budget: i64,
    pub tip: i64,
    pub location: String,
    pub duration: String,
    pub payment_mode: PaymentMode,
    pub poster_id: Uuid,
    pub buddy_id: Option<Uuid>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new task; the poster comes from the session.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub budget: i64,
    pub tip: i64,
    pub location: String,
    pub duration: String,
    pub payment_mode: PaymentMode,
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("You cannot accept your own task")]
    CannotAcceptOwnTask,

    #[error("This task has already been accepted by another buddy")]
    AlreadyAssigned,

    #[error("Task is {actual:?}, expected {expected:?}")]
    InvalidStatus {
        expected: TaskStatus,
        actual: TaskStatus,
    },

    #[error("Only the assigned buddy can do this")]
    NotAssignedBuddy,

    #[error("Only the task poster can do this")]
    NotPoster,

    #[error("Payment for this task has already been released")]
    AlreadySettled,

    #[error("Task has no assigned buddy")]
    NoBuddy,
}

impl Task {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.poster_id == user_id || self.buddy_id == Some(user_id)
    }

    pub fn total_earning(&self) -> i64 {
        self.budget + self.tip
    }

    pub fn settlement_amount(&self, include_tip: bool) -> i64 {
        if include_tip {
            self.total_earning()
        } else {
            self.budget
        }
    }

    // Passes only when the current status moves to `to` in one forward step.
    fn expect_transition(&self, to: TaskStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(to) {
            return Ok(());
        }
        let expected = TaskStatus::ALL
            .into_iter()
            .find(|from| from.can_transition_to(to))
            .unwrap_or(to);
        Err(TransitionError::InvalidStatus {
            expected,
            actual: self.status,
        })
    }

    pub fn check_accept(&self, actor: Uuid) -> Result<(), TransitionError> {
        if self.poster_id == actor {
            return Err(TransitionError::CannotAcceptOwnTask);
        }
        if self.buddy_id.is_some() {
            return Err(TransitionError::AlreadyAssigned);
        }
        self.expect_transition(TaskStatus::Assigned)
    }

    pub fn check_request_payment(&self, actor: Uuid) -> Result<(), TransitionError> {
        if self.buddy_id != Some(actor) {
            return Err(TransitionError::NotAssignedBuddy);
        }
        self.expect_transition(TaskStatus::Completed)
    }

    /// Returns the buddy to be paid.
    pub fn check_release_payment(&self, actor: Uuid) -> Result<Uuid, TransitionError> {
        if self.poster_id != actor {
            return Err(TransitionError::NotPoster);
        }
        if self.status == TaskStatus::Paid {
            return Err(TransitionError::AlreadySettled);
        }
        self.expect_transition(TaskStatus::Paid)?;
        self.buddy_id.ok_or(TransitionError::NoBuddy)
    }
}

#[cfg(test)]
pub(crate) fn sample_task(poster_id: Uuid) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        title: "Fix a leaking pipe".to_string(),
        description: "Kitchen sink pipe is leaking and needs a quick fix today.".to_string(),
        category: TaskCategory::Household,
        budget: 500,
        tip: 50,
        location: "Indiranagar".to_string(),
        duration: "2 hours".to_string(),
        payment_mode: PaymentMode::Online,
        poster_id,
        buddy_id: None,
        status: TaskStatus::Open,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_one_step() {
        use TaskStatus::*;
        let all = [Open, Assigned, Completed, Paid];
        for from in all {
            for to in all {
                let expected = matches!(
                    (from, to),
                    (Open, Assigned) | (Assigned, Completed) | (Completed, Paid)
                );
                assert_eq!(from.can_transition_to(to), expected, "{:?} -> {:?}", from, to);
            }
        }
        assert_eq!(Paid.next(), None);
    }

    #[test]
    fn test_status_wire_names() {
        let names: Vec<String> = [
            TaskStatus::Open,
            TaskStatus::Assigned,
            TaskStatus::Completed,
            TaskStatus::Paid,
        ]
        .iter()
        .map(|s| serde_json::to_value(s).unwrap().as_str().unwrap().to_string())
        .collect();
        assert_eq!(names, vec!["Open", "assigned", "completed", "paid"]);
    }

    #[test]
    fn test_task_json_uses_camel_case() {
        let task = sample_task(Uuid::new_v4());
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["paymentMode"], "online");
        assert_eq!(value["category"], "Household");
        assert!(value.get("posterId").is_some());
        assert!(value["buddyId"].is_null());
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(TaskCategory::from_label("tech"), Some(TaskCategory::Tech));
        assert_eq!(TaskCategory::from_label(" Tutoring "), Some(TaskCategory::Tutoring));
        assert_eq!(TaskCategory::from_label("Gardening"), None);
        assert_eq!(TaskCategory::normalize("Gardening"), TaskCategory::Other);
    }

    #[test]
    fn test_accept_rules() {
        let poster = Uuid::new_v4();
        let buddy = Uuid::new_v4();
        let mut task = sample_task(poster);

        assert_eq!(task.check_accept(poster), Err(TransitionError::CannotAcceptOwnTask));
        assert_eq!(task.check_accept(buddy), Ok(()));

        task.buddy_id = Some(buddy);
        task.status = TaskStatus::Assigned;
        assert_eq!(
            task.check_accept(Uuid::new_v4()),
            Err(TransitionError::AlreadyAssigned)
        );
    }

    #[test]
    fn test_request_payment_rules() {
        let poster = Uuid::new_v4();
        let buddy = Uuid::new_v4();
        let mut task = sample_task(poster);
        task.buddy_id = Some(buddy);
        task.status = TaskStatus::Assigned;

        assert_eq!(task.check_request_payment(poster), Err(TransitionError::NotAssignedBuddy));
        assert_eq!(task.check_request_payment(buddy), Ok(()));

        task.status = TaskStatus::Completed;
        assert_eq!(
            task.check_request_payment(buddy),
            Err(TransitionError::InvalidStatus {
                expected: TaskStatus::Assigned,
                actual: TaskStatus::Completed
            })
        );
    }

    #[test]
    fn test_release_rules() {
        let poster = Uuid::new_v4();
        let buddy = Uuid::new_v4();
        let mut task = sample_task(poster);
        task.buddy_id = Some(buddy);
        task.status = TaskStatus::Assigned;

        assert!(matches!(
            task.check_release_payment(poster),
            Err(TransitionError::InvalidStatus { .. })
        ));

        task.status = TaskStatus::Completed;
        assert_eq!(task.check_release_payment(buddy), Err(TransitionError::NotPoster));
        assert_eq!(task.check_release_payment(poster), Ok(buddy));

        task.status = TaskStatus::Paid;
        assert_eq!(task.check_release_payment(poster), Err(TransitionError::AlreadySettled));
    }

    #[test]
    fn test_checks_follow_the_state_machine() {
        let poster = Uuid::new_v4();
        let buddy = Uuid::new_v4();

        for status in TaskStatus::ALL {
            let mut open = sample_task(poster);
            open.status = status;
            assert_eq!(
                open.check_accept(buddy).is_ok(),
                status.can_transition_to(TaskStatus::Assigned),
                "accept from {:?}",
                status
            );

            let mut assigned = sample_task(poster);
            assigned.buddy_id = Some(buddy);
            assigned.status = status;
            assert_eq!(
                assigned.check_request_payment(buddy).is_ok(),
                status.can_transition_to(TaskStatus::Completed),
                "request payment from {:?}",
                status
            );
            assert_eq!(
                assigned.check_release_payment(poster).is_ok(),
                status.can_transition_to(TaskStatus::Paid),
                "release from {:?}",
                status
            );
        }

        let mut early = sample_task(poster);
        early.buddy_id = Some(buddy);
        assert_eq!(
            early.check_release_payment(poster),
            Err(TransitionError::InvalidStatus {
                expected: TaskStatus::Completed,
                actual: TaskStatus::Open
            })
        );
    }

    #[test]
    fn test_settlement_amount_excludes_tip_unless_enabled() {
        let task = sample_task(Uuid::new_v4());
        assert_eq!(task.settlement_amount(false), 500);
        assert_eq!(task.settlement_amount(true), 550);
    }
}
