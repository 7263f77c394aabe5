use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    dtos::userdtos::PublicUserDto,
    models::taskmodel::{NewTask, PaymentMode, Task, TaskCategory},
};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskDto {
    #[validate(custom = "validate_title")]
    pub title: String,

    #[validate(custom = "validate_description")]
    pub description: String,

    pub category: TaskCategory,

    #[validate(range(min = 1, message = "Budget must be at least 1"))]
    pub budget: i64,

    #[validate(range(min = 0, message = "Tip cannot be negative"))]
    #[serde(default)]
    pub tip: Option<i64>,

    #[validate(custom = "validate_location")]
    pub location: String,

    #[validate(custom = "validate_duration")]
    pub duration: String,

    pub payment_mode: PaymentMode,
}

// Lengths are counted on the trimmed value, the same value `into_new_task` stores.
fn trimmed_length(
    value: &str,
    min: usize,
    max: usize,
    message: &'static str,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        let mut error = ValidationError::new("length");
        error.message = Some(message.into());
        return Err(error);
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    trimmed_length(title, 5, 120, "Title must be between 5 and 120 characters")
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    trimmed_length(
        description,
        20,
        2000,
        "Description must be between 20 and 2000 characters",
    )
}

fn validate_location(location: &str) -> Result<(), ValidationError> {
    trimmed_length(location, 3, 200, "Location is required")
}

fn validate_duration(duration: &str) -> Result<(), ValidationError> {
    trimmed_length(duration, 3, 100, "Please enter an estimated duration")
}

impl CreateTaskDto {
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category,
            budget: self.budget,
            tip: self.tip.unwrap_or(0),
            location: self.location.trim().to_string(),
            duration: self.duration.trim().to_string(),
            payment_mode: self.payment_mode,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskQueryDto {
    pub category: Option<String>,
}

impl TaskQueryDto {
    /// `None` for "All" or no filter. Unknown labels are an error.
    pub fn category(&self) -> Result<Option<TaskCategory>, String> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(label) if label.eq_ignore_ascii_case("all") => Ok(None),
            Some(label) => TaskCategory::from_label(label)
                .map(Some)
                .ok_or_else(|| format!("Unknown category: {}", label)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetailDto {
    pub task: Task,
    pub poster: Option<PublicUserDto>,
    pub total_earning: i64,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponseDto {
    pub status: String,
    pub tasks: Vec<Task>,
    pub results: usize,
}

impl TaskListResponseDto {
    pub fn new(tasks: Vec<Task>) -> Self {
        TaskListResponseDto {
            status: "success".to_string(),
            results: tasks.len(),
            tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto() -> CreateTaskDto {
        serde_json::from_value(serde_json::json!({
            "title": "Fix a leaking pipe",
            "description": "Kitchen sink has been dripping for two days.",
            "category": "Household",
            "budget": 500,
            "location": "Koramangala, Bengaluru",
            "duration": "2 hours",
            "paymentMode": "online"
        }))
        .unwrap()
    }

    #[test]
    fn test_create_task_defaults_tip_to_zero() {
        let dto = dto();
        assert!(dto.validate().is_ok());
        let new_task = dto.into_new_task();
        assert_eq!(new_task.tip, 0);
        assert_eq!(new_task.payment_mode, PaymentMode::Online);
    }

    #[test]
    fn test_create_task_rejects_bad_amounts() {
        let mut bad = dto();
        bad.budget = 0;
        bad.tip = Some(-5);
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("budget"));
        assert!(fields.contains_key("tip"));
    }

    #[test]
    fn test_create_task_rejects_whitespace_only_fields() {
        let mut blank = dto();
        blank.title = "      ".to_string();
        blank.description = format!("{}short", " ".repeat(30));
        blank.location = " ".to_string();
        blank.duration = " ".to_string();

        let errors = blank.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["title", "description", "location", "duration"] {
            assert!(fields.contains_key(field), "{} should be rejected", field);
        }
    }

    #[test]
    fn test_create_task_minimum_lengths() {
        let mut short = dto();
        short.description = "Needs a plumber".to_string();
        short.location = "BL".to_string();
        short.duration = "2h".to_string();

        let errors = short.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("description"));
        assert!(fields.contains_key("location"));
        assert!(fields.contains_key("duration"));
        assert!(!fields.contains_key("title"));

        let mut padded = dto();
        padded.title = "  Fix a leaking pipe  ".to_string();
        assert!(padded.validate().is_ok());
        assert_eq!(padded.into_new_task().title, "Fix a leaking pipe");
    }

    #[test]
    fn test_category_query() {
        let query = |c: Option<&str>| TaskQueryDto {
            category: c.map(str::to_string),
        };
        assert_eq!(query(None).category(), Ok(None));
        assert_eq!(query(Some("All")).category(), Ok(None));
        assert_eq!(query(Some("tech")).category(), Ok(Some(TaskCategory::Tech)));
        assert!(query(Some("Gardening")).category().is_err());
    }
}
