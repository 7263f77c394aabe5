use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::taskdb::TaskExt,
    dtos::aidtos::{DescriptionRequestDto, TaskSuggestionInput},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::{
        ai_service::{suggestion_input_for, PROFILE_HISTORY_LIMIT},
        error::ServiceError,
    },
    AppState,
};

pub fn ai_handler() -> Router {
    Router::new()
        .route("/description", post(generate_description))
        .route("/suggestions", post(suggest_tasks))
        .route("/suggestions/me", get(suggest_tasks_for_me))
}

pub async fn generate_description(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<DescriptionRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let output = app_state
        .ai_service
        .generate_description(body.into())
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(output))
}

pub async fn suggest_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<TaskSuggestionInput>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let output = app_state
        .ai_service
        .suggest_tasks(body)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(output))
}

pub async fn suggest_tasks_for_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let paid_tasks = app_state
        .db_client
        .get_paid_tasks_for_buddy(user.user.id, PROFILE_HISTORY_LIMIT)
        .await
        .map_err(HttpError::from)?;

    let output = app_state
        .ai_service
        .suggest_tasks(suggestion_input_for(&user.user, &paid_tasks))
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(output))
}
