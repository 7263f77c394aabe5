use std::sync::Arc;

use axum::{
    extract::Path,
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dtos::{notificationdtos::NotificationListDto, ApiResponse},
    error::HttpError,
    handler::tasks::sse_events,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn notifications_handler() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", put(mark_all_read))
        .route("/live", get(notifications_live))
        .route("/:notification_id/read", put(mark_read))
}

pub async fn list_notifications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let (notifications, unread_count) = app_state
        .notification_service
        .list_recent(user.user.id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Notifications retrieved",
        NotificationListDto {
            notifications,
            unread_count,
        },
    )))
}

pub async fn mark_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let notification = app_state
        .notification_service
        .mark_read(user.user.id, notification_id)
        .await?;

    Ok(Json(ApiResponse::success("Notification marked as read", notification)))
}

pub async fn mark_all_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let updated = app_state
        .notification_service
        .mark_all_read(user.user.id)
        .await?;

    Ok(Json(ApiResponse::success(
        "All notifications marked as read",
        json!({ "updated": updated }),
    )))
}

pub async fn notifications_live(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let feed = app_state.notification_service.subscribe(user.user.id).await;
    Ok(Sse::new(sse_events("notification", feed)).keep_alive(KeepAlive::default()))
}
