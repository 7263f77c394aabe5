use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        chatdtos::{ChatListResponseDto, MessageListResponseDto, SendMessageDto},
        ApiResponse,
    },
    error::HttpError,
    handler::tasks::sse_events,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/", get(list_chats))
        .route("/:chat_id/messages", get(list_messages).post(send_message))
        .route("/:chat_id/live", get(chat_live))
}

pub async fn list_chats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let chats = app_state.chat_service.list_chats(user.user.id).await?;

    Ok(Json(ChatListResponseDto {
        status: "success".to_string(),
        chats,
    }))
}

pub async fn list_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let messages = app_state
        .chat_service
        .list_messages(chat_id, user.user.id)
        .await?;

    Ok(Json(MessageListResponseDto {
        status: "success".to_string(),
        messages,
    }))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(chat_id): Path<Uuid>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let message = app_state
        .chat_service
        .send_message(chat_id, user.user.id, &body.text)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Message sent", message)),
    ))
}

/// Full message list on connect, then the updated list after every new message.
pub async fn chat_live(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let snapshots = app_state
        .chat_service
        .subscribe(chat_id, user.user.id)
        .await?;

    Ok(Sse::new(sse_events("messages", snapshots)).keep_alive(KeepAlive::default()))
}
