use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use replus_core::UserId;
use replus_db::UserRecord;

use crate::auth::{self, AuthUser, LoginForm, RegisterForm};

use super::forms::JsonBody;
use super::{ApiError, AppState};

#[derive(Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserView,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Greets the caller. Missing or stale tokens fall back to `Guest`.
pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let name = auth::bearer_token(&headers)
        .and_then(|token| auth::authenticate(&state.db, token, state.token_ttl, Utc::now()).ok())
        .map(|user| user.username)
        .unwrap_or_else(|| "Guest".to_string());

    Json(json!({ "name": name }))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<RegisterForm>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let (user, token) = auth::register(&state.db, &form, Utc::now())?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            token,
            user: user.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let (user, token) = auth::login(&state.db, &form, Utc::now())?;

    Ok(Json(TokenResponse {
        token,
        user: user.into(),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .users()
        .revoke_token(&user.token)
        .map_err(auth::AuthError::from)?;

    tracing::info!(user = %user.id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Close the caller's account. Sessions, exercises, lines and tokens go with it.
pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .users()
        .delete(user.id)
        .map_err(auth::AuthError::from)?;

    tracing::info!(user = %user.id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(user: AuthUser) -> Json<UserView> {
    Json(UserView {
        id: user.id,
        username: user.username,
    })
}
