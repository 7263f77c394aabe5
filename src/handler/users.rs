use std::sync::Arc;

use axum::{
    extract::Path,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::{
        userdtos::{
            CompleteProfileDto, FilterUserDto, LeaderboardEntryDto, LocationUpdateDto,
            NameUpdateDto, PublicUserDto, SkillsUpdateDto, UserData, UserResponseDto,
            VerificationUpdateDto,
        },
        ApiResponse,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::{normalize_skills, User, UserRole, VerificationStatus},
    service::error::ServiceError,
    AppState,
};

pub const LEADERBOARD_SIZE: i64 = 10;

pub fn users_handler() -> Router {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/profile", put(complete_profile))
        .route("/me/name", put(update_user_name))
        .route("/me/skills", put(update_user_skills))
        .route("/me/location", put(update_user_location))
        .route("/me/verification", post(request_verification))
        .route("/leaderboard", get(get_leaderboard))
        .route("/:user_id", get(get_public_profile))
}

pub fn admin_handler() -> Router {
    Router::new().route(
        "/users/:user_id/verification",
        put(set_verification_status).layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Admin])
        })),
    )
}

fn user_response(user: &User) -> Json<UserResponseDto> {
    Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(user),
        },
    })
}

pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(user_response(&user.user))
}

pub async fn complete_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CompleteProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let app_language = body
        .app_language
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty());

    let updated = app_state
        .db_client
        .complete_profile(
            user.user.id,
            body.name.trim().to_string(),
            body.birth_year,
            app_language,
        )
        .await
        .map_err(HttpError::from)?;

    tracing::info!("Profile completed for user {}", updated.id);

    Ok(user_response(&updated))
}

pub async fn update_user_name(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<NameUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let updated = app_state
        .db_client
        .update_user_name(user.user.id, body.name.trim())
        .await
        .map_err(HttpError::from)?;

    Ok(user_response(&updated))
}

pub async fn update_user_skills(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<SkillsUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let updated = app_state
        .db_client
        .update_user_skills(user.user.id, normalize_skills(&body.skills))
        .await
        .map_err(HttpError::from)?;

    Ok(user_response(&updated))
}

pub async fn update_user_location(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<LocationUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let updated = app_state
        .db_client
        .update_user_location(user.user.id, Some(body.location.trim().to_string()))
        .await
        .map_err(HttpError::from)?;

    Ok(user_response(&updated))
}

/// Document upload is simulated; the request only moves the account to pending.
pub async fn request_verification(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    if user.user.verification_status == VerificationStatus::Verified {
        return Err(HttpError::conflict("Your account is already verified"));
    }

    let updated = app_state
        .db_client
        .update_verification_status(user.user.id, VerificationStatus::Pending)
        .await
        .map_err(HttpError::from)?
        .ok_or_else(|| HttpError::from(ServiceError::UserNotFound(user.user.id)))?;

    tracing::info!("Verification requested by user {}", updated.id);

    Ok(user_response(&updated))
}

pub async fn set_verification_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddeware>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<VerificationUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    if body.status == VerificationStatus::Pending {
        return Err(HttpError::bad_request(
            "Status must be either verified or unverified",
        ));
    }

    let updated = app_state
        .db_client
        .update_verification_status(user_id, body.status)
        .await
        .map_err(HttpError::from)?
        .ok_or_else(|| HttpError::from(ServiceError::UserNotFound(user_id)))?;

    tracing::info!(
        "Admin {} set verification of {} to {}",
        admin.user.id,
        user_id,
        body.status.to_str()
    );

    Ok(user_response(&updated))
}

pub async fn get_leaderboard(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let users = app_state
        .db_client
        .get_leaderboard(LEADERBOARD_SIZE)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Leaderboard retrieved",
        LeaderboardEntryDto::rank_users(&users),
    )))
}

pub async fn get_public_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(Some(user_id), None, None, None)
        .await
        .map_err(HttpError::from)?
        .ok_or_else(|| HttpError::from(ServiceError::UserNotFound(user_id)))?;

    Ok(Json(ApiResponse::success(
        "User retrieved",
        PublicUserDto::from_user(&user),
    )))
}
