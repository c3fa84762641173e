use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

use replus_core::{Exercise, NameForm, Session};

use crate::auth::AuthUser;

use super::forms::{JsonBody, NameRequest};
use super::{ApiError, AppState};

/// A session together with its exercises.
#[derive(Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub exercises: Vec<Exercise>,
}

pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(state.workouts.sessions_of(user.id)?))
}

pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<NameRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let form = NameForm::from(&request);
    let session = state.workouts.create_session(user.id, &form)?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session): Path<String>,
) -> Result<Json<SessionDetail>, ApiError> {
    let found = state.workouts.session(user.id, &session)?;
    let exercises = state.workouts.exercises_of_session(user.id, &found.slug)?;

    Ok(Json(SessionDetail {
        session: found,
        exercises,
    }))
}

pub async fn rename_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session): Path<String>,
    JsonBody(request): JsonBody<NameRequest>,
) -> Result<Json<Session>, ApiError> {
    let form = NameForm::from(&request);
    Ok(Json(state.workouts.rename_session(user.id, &session, &form)?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.workouts.delete_session(user.id, &session)?;
    Ok(StatusCode::NO_CONTENT)
}
