use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    models::taskmodel::{TaskStatus, TransitionError},
    service::{ai_service::AiError, google_oauth::OAuthError, phone_auth::PhoneAuthError},
};

pub const GENERIC_SERVER_MESSAGE: &str = "Something went wrong. Please try again later.";
pub const GENERIC_AI_MESSAGE: &str = "Could not generate content. Please try again.";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    #[error("Chat {0} not found")]
    ChatNotFound(Uuid),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Notification {0} not found")]
    NotificationNotFound(Uuid),

    #[error("Task is {actual:?}, expected {expected:?}")]
    InvalidTaskStatus {
        expected: TaskStatus,
        actual: TaskStatus,
    },

    #[error("You are not a participant of this task")]
    NotTaskParticipant,

    #[error("You cannot accept your own task")]
    CannotAcceptOwnTask,

    #[error("This task has already been accepted by another buddy")]
    AlreadyAssigned,

    #[error("Payment for this task has already been released")]
    AlreadySettled,

    #[error("{0}")]
    NotPermitted(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ServiceError {
    /// Failures on our side, as opposed to a request the caller should not have made.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ServiceError::Database(_) | ServiceError::Ai(_) | ServiceError::Other(_)
        )
    }
}

impl From<TransitionError> for ServiceError {
    fn from(error: TransitionError) -> Self {
        match error {
            TransitionError::CannotAcceptOwnTask => ServiceError::CannotAcceptOwnTask,
            TransitionError::AlreadyAssigned => ServiceError::AlreadyAssigned,
            TransitionError::AlreadySettled => ServiceError::AlreadySettled,
            TransitionError::InvalidStatus { expected, actual } => {
                ServiceError::InvalidTaskStatus { expected, actual }
            }
            TransitionError::NotAssignedBuddy | TransitionError::NotPoster => {
                ServiceError::NotPermitted(error.to_string())
            }
            TransitionError::NoBuddy => ServiceError::Validation(error.to_string()),
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::TaskNotFound(_)
            | ServiceError::ChatNotFound(_)
            | ServiceError::UserNotFound(_)
            | ServiceError::NotificationNotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::InvalidTaskStatus { .. }
            | ServiceError::CannotAcceptOwnTask
            | ServiceError::Validation(_) => HttpError::bad_request(error.to_string()),

            ServiceError::NotTaskParticipant | ServiceError::NotPermitted(_) => {
                HttpError::forbidden(error.to_string())
            }

            ServiceError::AlreadyAssigned | ServiceError::AlreadySettled => {
                HttpError::conflict(error.to_string())
            }

            ServiceError::Ai(AiError::InvalidInput(message)) => HttpError::bad_request(message),
            ServiceError::Ai(ref ai_error) => {
                tracing::error!("AI generation failed: {}", ai_error);
                HttpError::bad_gateway(GENERIC_AI_MESSAGE)
            }

            ServiceError::Database(ref db_error) => {
                tracing::error!("Database error: {}", db_error);
                HttpError::server_error(GENERIC_SERVER_MESSAGE)
            }

            ServiceError::Other(ref message) => {
                tracing::error!("Service error: {}", message);
                HttpError::server_error(GENERIC_SERVER_MESSAGE)
            }
        }
    }
}

impl From<PhoneAuthError> for HttpError {
    fn from(error: PhoneAuthError) -> Self {
        match error {
            PhoneAuthError::InvalidPhoneNumber
            | PhoneAuthError::CaptchaFailed
            | PhoneAuthError::InvalidCode => HttpError::bad_request(error.to_string()),
            PhoneAuthError::TooManyAttempts | PhoneAuthError::QuotaExceeded => {
                HttpError::too_many_requests(error.to_string())
            }
            PhoneAuthError::Delivery(_) | PhoneAuthError::Http(_) => {
                tracing::error!("Phone sign-in failed: {}", error);
                HttpError::bad_gateway(error.to_string())
            }
            PhoneAuthError::Database(ref db_error) => {
                tracing::error!("Database error: {}", db_error);
                HttpError::server_error(GENERIC_SERVER_MESSAGE)
            }
        }
    }
}

impl From<OAuthError> for HttpError {
    fn from(error: OAuthError) -> Self {
        match error {
            OAuthError::NotConfigured => HttpError::new(
                error.to_string(),
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
            ),
            OAuthError::Reqwest(_) => {
                tracing::error!("Google sign-in failed: {}", error);
                HttpError::bad_gateway(error.to_string())
            }
            OAuthError::JwtValidation(_) => HttpError::unauthorized(error.to_string()),
        }
    }
}

impl From<sqlx::Error> for HttpError {
    fn from(error: sqlx::Error) -> Self {
        ServiceError::Database(error).into()
    }
}

impl From<String> for ServiceError {
    fn from(err: String) -> Self {
        ServiceError::Other(err)
    }
}
