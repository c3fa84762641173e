use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use replus_core::{Line, LineForm};

use crate::auth::AuthUser;

use super::forms::{JsonBody, LineRequest};
use super::{ApiError, AppState};

pub async fn list_lines(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session, exercise)): Path<(String, String)>,
) -> Result<Json<Vec<Line>>, ApiError> {
    Ok(Json(
        state
            .workouts
            .lines_of_exercise(user.id, &session, &exercise)?,
    ))
}

pub async fn log_line(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session, exercise)): Path<(String, String)>,
    JsonBody(request): JsonBody<LineRequest>,
) -> Result<(StatusCode, Json<Line>), ApiError> {
    let line = state
        .workouts
        .log_line(user.id, &session, &exercise, &LineForm::from(&request))?;
    Ok((StatusCode::CREATED, Json(line)))
}

pub async fn delete_line(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session, exercise, line)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .workouts
        .delete_line(user.id, &session, &exercise, &line)?;
    Ok(StatusCode::NO_CONTENT)
}
