// service/ai_service.rs
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use validator::Validate;

use crate::{
    dtos::aidtos::{
        GenerateDescriptionInput, GenerateDescriptionOutput, TaskHistoryItem, TaskSuggestion,
        TaskSuggestionInput, TaskSuggestionOutput,
    },
    models::{
        taskmodel::{Task, TaskCategory, TaskStatus},
        usermodel::User,
    },
};

pub const DESCRIPTION_WORD_LIMIT: usize = 50;
pub const PROFILE_HISTORY_LIMIT: i64 = 5;
const DEFAULT_SKILLS: [&str; 2] = ["General Help", "Driving"];
const UNKNOWN_LOCATION: &str = "Not specified";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model returned an error: {0}")]
    Upstream(String),

    #[error("Model returned no output")]
    EmptyOutput,

    #[error("Model output did not match the expected shape: {0}")]
    InvalidOutput(String),
}

/// A model that answers a prompt with JSON matching `response_schema`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_json(
        &self,
        prompt: &str,
        response_schema: &Value,
    ) -> Result<Option<String>, AiError>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_json(
        &self,
        prompt: &str,
        response_schema: &Value,
    ) -> Result<Option<String>, AiError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::Upstream(format!("HTTP {} - {}", status, error_text)));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        Ok(parsed.first_text())
    }
}

#[derive(Clone)]
pub struct AiService {
    generator: Arc<dyn TextGenerator>,
}

impl std::fmt::Debug for AiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiService").finish_non_exhaustive()
    }
}

impl AiService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn generate_description(
        &self,
        input: GenerateDescriptionInput,
    ) -> Result<GenerateDescriptionOutput, AiError> {
        input
            .validate()
            .map_err(|_| AiError::InvalidInput("Task title is required".to_string()))?;

        let prompt = render_description_prompt(&input);
        let raw = self
            .generator
            .generate_json(&prompt, &description_schema())
            .await?
            .ok_or(AiError::EmptyOutput)?;

        let output: GenerateDescriptionOutput =
            serde_json::from_str(&raw).map_err(|e| AiError::InvalidOutput(e.to_string()))?;
        let output = GenerateDescriptionOutput {
            description: output.description.trim().to_string(),
        };
        output
            .validate()
            .map_err(|_| AiError::InvalidOutput("description is empty".to_string()))?;

        let words = word_count(&output.description);
        if words > DESCRIPTION_WORD_LIMIT {
            tracing::warn!(
                "Generated description for {:?} has {} words, over the {} word target",
                input.title,
                words,
                DESCRIPTION_WORD_LIMIT
            );
        }

        Ok(output)
    }

    pub async fn suggest_tasks(
        &self,
        input: TaskSuggestionInput,
    ) -> Result<TaskSuggestionOutput, AiError> {
        input
            .validate()
            .map_err(|e| AiError::InvalidInput(e.to_string()))?;

        let prompt = render_suggestion_prompt(&input);
        let raw = self
            .generator
            .generate_json(&prompt, &suggestion_schema())
            .await?
            .ok_or(AiError::EmptyOutput)?;

        let output: TaskSuggestionOutput =
            serde_json::from_str(&raw).map_err(|e| AiError::InvalidOutput(e.to_string()))?;

        normalize_suggestions(output)
    }
}

/// Suggestion request built from a stored profile and its paid tasks.
pub fn suggestion_input_for(user: &User, paid_tasks: &[Task]) -> TaskSuggestionInput {
    let user_skills = if user.skills.is_empty() {
        DEFAULT_SKILLS.iter().map(|s| s.to_string()).collect()
    } else {
        user.skills.clone()
    };

    let current_location = user
        .location
        .clone()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

    let task_history = paid_tasks
        .iter()
        .take(PROFILE_HISTORY_LIMIT as usize)
        .map(|task| TaskHistoryItem {
            title: task.title.clone(),
            category: task.category.to_str().to_string(),
            completed: task.status == TaskStatus::Paid,
        })
        .collect();

    TaskSuggestionInput {
        user_skills,
        current_location: Some(current_location),
        task_history: Some(task_history),
    }
}

pub fn render_description_prompt(input: &GenerateDescriptionInput) -> String {
    format!(
        "Generate a concise, clear, and compelling task description of up to {} words based on the following task title:\n\n\
         Task Title: \"{}\"\n\n\
         The description should briefly explain what the task involves and what is expected. \
         It should be written in a way that is easy to understand for a general audience.",
        DESCRIPTION_WORD_LIMIT,
        input.title.trim()
    )
}

pub fn render_suggestion_prompt(input: &TaskSuggestionInput) -> String {
    let skills = if input.user_skills.is_empty() {
        "None listed".to_string()
    } else {
        input.user_skills.join(", ")
    };
    let location = input
        .current_location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(UNKNOWN_LOCATION);

    let history = match input.task_history.as_deref() {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|item| format!("- \"{}\" (Category: {})", item.title, item.category))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "No tasks completed yet.".to_string(),
    };

    let categories = TaskCategory::ALL
        .iter()
        .map(|c| c.to_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a helpful assistant in a cyberpunk-themed task-runner app. \
         Based on the user's profile, suggest 3-5 tasks they would be good at and likely to enjoy.\n\n\
         User Profile:\n\
         - Skills: {skills}\n\
         - Location: {location}\n\n\
         Task History:\n\
         {history}\n\n\
         For each suggestion, provide a catchy title, a relevant category from this list ({categories}), \
         a brief reasoning for why it's a good fit, and an estimated earning in rupees."
    )
}

fn description_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "description": { "type": "STRING" }
        },
        "required": ["description"]
    })
}

fn suggestion_schema() -> Value {
    let categories: Vec<&str> = TaskCategory::ALL.iter().map(|c| c.to_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "suggestions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "category": { "type": "STRING", "enum": categories },
                        "reasoning": { "type": "STRING" },
                        "estimatedEarning": { "type": "NUMBER" }
                    },
                    "required": ["title", "category", "reasoning", "estimatedEarning"]
                }
            }
        },
        "required": ["suggestions"]
    })
}

/// Rejects unusable suggestions and folds unknown categories into `Other`.
pub fn normalize_suggestions(output: TaskSuggestionOutput) -> Result<TaskSuggestionOutput, AiError> {
    if output.suggestions.is_empty() {
        return Err(AiError::EmptyOutput);
    }

    let suggestions = output
        .suggestions
        .into_iter()
        .map(|s| {
            let title = s.title.trim().to_string();
            if title.is_empty() {
                return Err(AiError::InvalidOutput("suggestion without a title".to_string()));
            }
            if !s.estimated_earning.is_finite() || s.estimated_earning < 0.0 {
                return Err(AiError::InvalidOutput(format!(
                    "suggestion {:?} has an invalid earning",
                    title
                )));
            }
            Ok(TaskSuggestion {
                title,
                category: TaskCategory::normalize(&s.category).to_str().to_string(),
                reasoning: s.reasoning.trim().to_string(),
                estimated_earning: s.estimated_earning,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TaskSuggestionOutput { suggestions })
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
