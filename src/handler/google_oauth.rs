use std::sync::Arc;

use axum::{response::IntoResponse, routing::post, Extension, Json, Router};
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::userdtos::GoogleSignInDto,
    error::{ErrorMessage, HttpError},
    handler::auth::session_response,
    AppState,
};

pub fn oauth_handler() -> Router {
    Router::new().route("/google", post(google_sign_in))
}

/// Signs in with an ID token from the Google popup, creating or linking the account.
pub async fn google_sign_in(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<GoogleSignInDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let user_info = app_state.google_auth.validate_id_token(&body.id_token).await?;

    let user = app_state
        .db_client
        .upsert_google_user(
            &user_info.sub,
            user_info.email.as_deref(),
            user_info.name.as_deref(),
            user_info.picture.as_deref(),
        )
        .await
        .map_err(google_account_error)?;

    tracing::info!("Google sign-in for user {}", user.id);

    session_response(&app_state, &user)
}

// The verified email already belongs to an account linked to a different Google id.
fn google_account_error(e: sqlx::Error) -> HttpError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            HttpError::unique_constraint_violation(
                ErrorMessage::EmailLinkedToAnotherAccount.to_string(),
            )
        }
        e => HttpError::from(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::db::DBClient;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[test]
    fn test_other_database_errors_stay_generic() {
        let error = google_account_error(sqlx::Error::PoolTimedOut);
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_email_owned_by_another_google_account_conflicts(pool: PgPool) {
        let db = DBClient::new(pool);
        db.save_user(None, "asha@example.com", "hash").await.unwrap();
        db.upsert_google_user("google-123", Some("asha@example.com"), None, None)
            .await
            .unwrap();

        let error = db
            .upsert_google_user("google-456", Some("asha@example.com"), None, None)
            .await
            .unwrap_err();

        let error = google_account_error(error);
        assert_eq!(error.status, StatusCode::CONFLICT);
        assert_eq!(
            error.message,
            ErrorMessage::EmailLinkedToAnotherAccount.to_string()
        );
    }
}
