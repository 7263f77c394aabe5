use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::{
        taskdtos::{CreateTaskDto, TaskDetailDto, TaskListResponseDto, TaskQueryDto},
        userdtos::PublicUserDto,
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn tasks_handler() -> Router {
    Router::new()
        .route("/", post(create_task).get(browse_tasks))
        .route("/mine/completed", get(my_completed_tasks))
        .route("/:task_id", get(get_task))
        .route("/:task_id/accept", post(accept_task))
        .route("/:task_id/request-payment", post(request_payment))
        .route("/:task_id/release-payment", post(release_payment))
        .route("/:task_id/live", get(task_live))
        .route("/:task_id/chat", post(open_chat))
}

/// Serializes each item as a named SSE event; items that fail to serialize are skipped.
pub fn sse_events<S, T>(name: &'static str, stream: S) -> impl Stream<Item = Result<Event, Infallible>>
where
    S: Stream<Item = T>,
    T: Serialize,
{
    stream.filter_map(move |item| async move {
        match Event::default().event(name).json_data(&item) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::error!("Failed to serialize {} event: {}", name, e);
                None
            }
        }
    })
}

pub async fn create_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateTaskDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let task = app_state
        .task_service
        .create_task(&user.user, body.into_new_task())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Task posted", task)),
    ))
}

pub async fn browse_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Query(query): Query<TaskQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let category = query.category().map_err(HttpError::bad_request)?;

    let tasks = app_state
        .task_service
        .browse_tasks(user.user.id, category)
        .await?;

    Ok(Json(TaskListResponseDto::new(tasks)))
}

pub async fn my_completed_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let tasks = app_state.task_service.completed_tasks_for(user.user.id).await?;
    Ok(Json(TaskListResponseDto::new(tasks)))
}

pub async fn get_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state.task_service.get_task(task_id).await?;

    let poster = app_state
        .db_client
        .get_user(Some(task.poster_id), None, None, None)
        .await
        .map_err(HttpError::from)?
        .map(|poster| PublicUserDto::from_user(&poster));

    let total_earning = task.total_earning();

    Ok(Json(ApiResponse::success(
        "Task retrieved",
        TaskDetailDto {
            task,
            poster,
            total_earning,
        },
    )))
}

pub async fn accept_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state.task_service.accept_task(task_id, &user.user).await?;
    Ok(Json(ApiResponse::success("Task accepted", task)))
}

pub async fn request_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state
        .task_service
        .request_payment(task_id, &user.user)
        .await?;
    Ok(Json(ApiResponse::success("Payment requested", task)))
}

pub async fn release_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let settlement = app_state
        .escrow_service
        .release_payment(task_id, &user.user)
        .await?;
    Ok(Json(ApiResponse::success("Payment released", settlement)))
}

pub async fn task_live(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let feed = app_state.task_service.subscribe(task_id).await?;
    Ok(Sse::new(sse_events("task", feed)).keep_alive(KeepAlive::default()))
}

pub async fn open_chat(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let chat = app_state.chat_service.open_chat(task_id, user.user.id).await?;
    Ok(Json(ApiResponse::success("Chat ready", chat)))
}
