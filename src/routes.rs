use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        ai::ai_handler,
        auth::auth_handler,
        chat::chat_handler,
        google_oauth::oauth_handler,
        notifications::notifications_handler,
        tasks::tasks_handler,
        users::{admin_handler, users_handler},
        wallet::wallet_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/oauth", oauth_handler())
        .nest("/users", users_handler().layer(middleware::from_fn(auth)))
        .nest("/admin", admin_handler().layer(middleware::from_fn(auth)))
        .nest("/tasks", tasks_handler().layer(middleware::from_fn(auth)))
        .nest("/chats", chat_handler().layer(middleware::from_fn(auth)))
        .nest("/wallet", wallet_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/notifications",
            notifications_handler().layer(middleware::from_fn(auth)),
        )
        .nest("/ai", ai_handler().layer(middleware::from_fn(auth)))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = Config::test_config();
        // Never connects unless a handler reaches the database.
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        create_router(Arc::new(AppState::new(config, pool).unwrap()))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_session() {
        for uri in ["/api/tasks", "/api/wallet", "/api/notifications", "/api/users/me"] {
            let response = test_router()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body_json(response).await["status"], "fail");
        }
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::get("/api/tasks")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_validation_lists_fields() {
        let body = json!({
            "name": "Asha",
            "email": "not-an-email",
            "password": "123",
            "passwordConfirm": "456"
        });

        let response = test_router()
            .oneshot(
                Request::post("/api/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        let errors = json["errors"].as_object().unwrap();
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
        assert!(errors.contains_key("passwordConfirm"));
    }

    #[tokio::test]
    async fn test_logout_clears_the_cookie() {
        let response = test_router()
            .oneshot(Request::post("/api/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("token=;"));
    }
}
