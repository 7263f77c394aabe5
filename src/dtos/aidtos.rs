use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct GenerateDescriptionInput {
    #[validate(custom = "not_blank")]
    pub title: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateDescriptionOutput {
    #[validate(custom = "not_blank")]
    pub description: String,
}

/// Description request as the create-task form sends it.
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionRequestDto {
    #[validate(length(min = 5, message = "Title must be at least 5 characters"))]
    pub title: String,
}

impl From<DescriptionRequestDto> for GenerateDescriptionInput {
    fn from(dto: DescriptionRequestDto) -> Self {
        GenerateDescriptionInput {
            title: dto.title.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskHistoryItem {
    pub title: String,
    pub category: String,
    pub completed: bool,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestionInput {
    #[validate(length(max = 50, message = "At most 50 skills can be sent"))]
    pub user_skills: Vec<String>,
    pub current_location: Option<String>,
    #[validate(length(max = 20, message = "At most 20 history items can be sent"))]
    pub task_history: Option<Vec<TaskHistoryItem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestion {
    pub title: String,
    pub category: String,
    pub reasoning: String,
    pub estimated_earning: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSuggestionOutput {
    pub suggestions: Vec<TaskSuggestion>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("required");
        error.message = Some("This field is required".into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_is_rejected() {
        let input = GenerateDescriptionInput {
            title: "   ".to_string(),
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn test_suggestion_input_uses_camel_case() {
        let input: TaskSuggestionInput = serde_json::from_value(serde_json::json!({
            "userSkills": ["Plumbing"],
            "currentLocation": "Pune",
            "taskHistory": [{"title": "Fix tap", "category": "Household", "completed": true}]
        }))
        .unwrap();
        assert_eq!(input.user_skills, vec!["Plumbing".to_string()]);
        assert!(input.validate().is_ok());
    }
}
