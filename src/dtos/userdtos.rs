use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::usermodel::{User, VerificationStatus};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "passwords do not match"))]
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneStartDto {
    #[validate(length(min = 8, max = 20, message = "Phone number is required"))]
    pub phone_number: String,
    #[serde(default)]
    pub captcha_token: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneVerifyDto {
    #[validate(length(min = 8, max = 20, message = "Phone number is required"))]
    pub phone_number: String,
    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub code: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSignInDto {
    #[validate(length(min = 1, message = "ID token is required"))]
    pub id_token: String,
}

/// The caller's own view of their account.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterUserDto {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub photo_url: Option<String>,
    pub role: String,
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

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            phone_number: user.phone_number.to_owned(),
            photo_url: user.photo_url.to_owned(),
            role: user.role.to_str().to_string(),
            wallet_balance: user.wallet_balance,
            xp: user.xp,
            verification_status: user.verification_status,
            skills: user.skills.clone(),
            location: user.location.clone(),
            birth_year: user.birth_year,
            app_language: user.app_language.clone(),
            profile_completed: user.profile_completed,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// What other users may see, e.g. on a task's poster card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserDto {
    pub id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
    pub xp: i32,
    pub verification_status: VerificationStatus,
}

impl PublicUserDto {
    pub fn from_user(user: &User) -> Self {
        PublicUserDto {
            id: user.id,
            name: user.display_name_or("TaskBuddy user").to_string(),
            photo_url: user.photo_url.clone(),
            xp: user.xp,
            verification_status: user.verification_status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub token: String,
    pub user: FilterUserDto,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct NameUpdateDto {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "birth_year_not_in_future", skip_on_field_errors = false))]
pub struct CompleteProfileDto {
    #[validate(length(min = 3, max = 100, message = "Name must be at least 3 characters"))]
    pub name: String,
    #[validate(range(min = 1900, message = "Birth year must be 1900 or later"))]
    pub birth_year: i32,
    #[validate(length(max = 20, message = "Language code is too long"))]
    pub app_language: Option<String>,
}

fn birth_year_not_in_future(dto: &CompleteProfileDto) -> Result<(), ValidationError> {
    if dto.birth_year > Utc::now().year() {
        let mut error = ValidationError::new("birth_year");
        error.message = Some("Birth year cannot be in the future".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SkillsUpdateDto {
    #[validate(length(max = 30, message = "At most 30 skills can be listed"))]
    pub skills: Vec<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct LocationUpdateDto {
    #[validate(length(min = 1, max = 200, message = "Location is required"))]
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationUpdateDto {
    pub status: VerificationStatus,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryDto {
    pub rank: usize,
    pub id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
    pub xp: i32,
}

impl LeaderboardEntryDto {
    pub fn rank_users(users: &[User]) -> Vec<LeaderboardEntryDto> {
        users
            .iter()
            .enumerate()
            .map(|(i, user)| LeaderboardEntryDto {
                rank: i + 1,
                id: user.id,
                name: user.display_name_or("TaskBuddy user").to_string(),
                photo_url: user.photo_url.clone(),
                xp: user.xp,
            })
            .collect()
    }
}
