//! Auth API Handlers
//!
//! Password registration and login, short-lived access tokens and a
//! rotating refresh-token cookie scoped to the refresh endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use axum_extra::{headers::Cookie, TypedHeader};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::auth::{generate_salt, hash_password, verify_password};
use crate::models::{LoginRequest, RegisterRequest, User, UserResponse};
use crate::utils::response::AppError;
use crate::AppState;

const REFRESH_COOKIE: &str = "RefreshToken";
const REFRESH_PATH: &str = "/api/v1/auth/refresh";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64,
}

fn refresh_cookie(token: &str, max_age_secs: u64) -> (header::HeaderName, String) {
    (
        header::SET_COOKIE,
        format!(
            "{}={}; HttpOnly; Path={}; Max-Age={}; SameSite=Strict",
            REFRESH_COOKIE, token, REFRESH_PATH, max_age_secs
        ),
    )
}

/// Register a new user
/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate()
        .map_err(|e| AppError::bad_request(&e.to_string()))?;

    let salt = generate_salt();
    let user = User {
        id: Uuid::new_v4(),
        username: req.username.clone(),
        password_hash: hash_password(&req.password, &salt),
        password_salt: salt,
        created_at: Utc::now(),
    };
    let response = UserResponse::from(&user);

    if !state.store.insert_user(user) {
        return Err(AppError::conflict("username already taken"));
    }
    tracing::info!(user = %response.id, username = %req.username, "user registered");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with username and password
/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .find_user_by_username(&req.username)
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;
    if !verify_password(&req.password, &user.password_salt, &user.password_hash) {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let (access_token, expires_at) = state
        .jwt
        .generate_token(user.id)
        .map_err(|e| AppError::internal(&e.to_string()))?;
    let refresh_token = state.refresh_tokens.issue(user.id);

    tracing::info!(user = %user.id, "login");
    Ok((
        AppendHeaders([refresh_cookie(
            &refresh_token,
            state.refresh_tokens.ttl_seconds(),
        )]),
        Json(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at,
        }),
    ))
}

/// Rotate the refresh token and mint a new access token
/// POST /auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    cookie: Option<TypedHeader<Cookie>>,
) -> Result<impl IntoResponse, AppError> {
    let presented = cookie
        .as_ref()
        .and_then(|c| c.get(REFRESH_COOKIE))
        .ok_or_else(|| AppError::unauthorized("missing refresh token"))?;

    let (user_id, next_token) = state
        .refresh_tokens
        .rotate(presented)
        .ok_or_else(|| AppError::unauthorized("invalid refresh token"))?;

    let (access_token, expires_at) = state
        .jwt
        .generate_token(user_id)
        .map_err(|e| AppError::internal(&e.to_string()))?;

    Ok((
        AppendHeaders([refresh_cookie(
            &next_token,
            state.refresh_tokens.ttl_seconds(),
        )]),
        Json(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at,
        }),
    ))
}

/// Invalidate every refresh token of the caller
/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> impl IntoResponse {
    state.refresh_tokens.revoke_all(auth_user.user_id);
    tracing::info!(user = %auth_user.user_id, "logout");
    (
        AppendHeaders([refresh_cookie("", 0)]),
        StatusCode::NO_CONTENT,
    )
}
