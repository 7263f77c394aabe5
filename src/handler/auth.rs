use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response as AxumResponse},
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::{
        userdtos::{
            FilterUserDto, LoginUserDto, PhoneStartDto, PhoneVerifyDto, RegisterUserDto,
            UserData, UserLoginResponseDto, UserResponseDto,
        },
        Response,
    },
    error::{ErrorMessage, HttpError},
    models::usermodel::User,
    utils::{password, token},
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/phone/start", post(phone_start))
        .route("/phone/verify", post(phone_verify))
}

/// Issues the session token both as a cookie and in the JSON body.
pub fn session_response(app_state: &AppState, user: &User) -> Result<AxumResponse, HttpError> {
    let token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let cookie_duration = time::Duration::minutes(app_state.env.jwt_maxage);
    let cookie = Cookie::build(("token", token.clone()))
        .path("/")
        .max_age(cookie_duration)
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| HttpError::server_error(e.to_string()))?,
    );

    let mut response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token,
        user: FilterUserDto::filter_user(user),
    })
    .into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let email = body.email.trim().to_lowercase();

    let existing_user = app_state
        .db_client
        .get_user(None, Some(&email), None, None)
        .await
        .map_err(HttpError::from)?;

    if existing_user.is_some() {
        return Err(HttpError::unique_constraint_violation(
            ErrorMessage::EmailExist.to_string(),
        ));
    }

    let hashed_password =
        password::hash(&body.password).map_err(|e| HttpError::server_error(e.to_string()))?;

    let user = app_state
        .db_client
        .save_user(Some(body.name.trim().to_string()), email, hashed_password)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                HttpError::unique_constraint_violation(ErrorMessage::EmailExist.to_string())
            }
            e => HttpError::from(e),
        })?;

    tracing::info!("New user registered: {}", user.id);

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user),
        },
    }))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let result = app_state
        .db_client
        .get_user(None, Some(&body.email.trim().to_lowercase()), None, None)
        .await
        .map_err(HttpError::from)?;

    let user =
        result.ok_or(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    // Accounts created by Google or phone sign-in have no password.
    let hashed = user
        .password
        .as_deref()
        .ok_or(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, hashed)
        .map_err(|_| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    if !password_matched {
        return Err(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()));
    }

    session_response(&app_state, &user)
}

pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    let cookie = Cookie::build(("token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| HttpError::server_error(e.to_string()))?,
    );

    let mut response = Json(Response {
        status: "success",
        message: "Logged out".to_string(),
    })
    .into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

pub async fn phone_start(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<PhoneStartDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    app_state
        .phone_auth
        .start_sign_in(&body.phone_number, &body.captcha_token)
        .await?;

    Ok(Json(Response {
        status: "success",
        message: "Verification code sent".to_string(),
    }))
}

pub async fn phone_verify(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<PhoneVerifyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let user = app_state
        .phone_auth
        .verify_sign_in(&body.phone_number, &body.code)
        .await?;

    session_response(&app_state, &user)
}
