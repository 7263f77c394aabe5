use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "verification_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Verified,
}

impl VerificationStatus {
    pub fn to_str(&self) -> &str {
        match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub google_id: Option<String>,
    pub photo_url: Option<String>,
    pub role: UserRole,
    pub wallet_balance: i64,
    pub xp: i32,
    pub verification_status: VerificationStatus,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub birth_year: Option<i32>,
    pub app_language: Option<String>,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown to other users, falling back when the profile is not set up.
    pub fn display_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(fallback)
    }
}

/// Trim, drop blanks and de-duplicate case-insensitively, keeping first spelling.
pub fn normalize_skills(skills: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    skills
        .iter()
        .map(|skill| skill.trim())
        .filter(|skill| !skill.is_empty())
        .filter(|skill| seen.insert(skill.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_user(name: Option<&str>) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: name.map(str::to_string),
        email: Some("buddy@example.com".to_string()),
        phone_number: None,
        password: Some("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string()),
        google_id: None,
        photo_url: None,
        role: UserRole::User,
        wallet_balance: 0,
        xp: 0,
        verification_status: VerificationStatus::Unverified,
        skills: vec![],
        location: None,
        birth_year: None,
        app_language: None,
        profile_completed: false,
        created_at: now,
        updated_at: now,
    }
}
