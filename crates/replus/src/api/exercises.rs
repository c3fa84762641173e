use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

use replus_core::{Exercise, ExerciseStats, Line, NameForm};

use crate::auth::AuthUser;

use super::forms::{JsonBody, NameRequest};
use super::{ApiError, AppState};

/// An exercise with its lines and derived statistics.
#[derive(Serialize)]
pub struct ExerciseDetail {
    #[serde(flatten)]
    pub stats: ExerciseStats,
    pub lines: Vec<Line>,
}

pub async fn list_exercises(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session): Path<String>,
) -> Result<Json<Vec<Exercise>>, ApiError> {
    Ok(Json(state.workouts.exercises_of_session(user.id, &session)?))
}

pub async fn create_exercise(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session): Path<String>,
    JsonBody(request): JsonBody<NameRequest>,
) -> Result<(StatusCode, Json<Exercise>), ApiError> {
    let form = NameForm::from(&request);
    let exercise = state.workouts.create_exercise(user.id, &session, &form)?;
    Ok((StatusCode::CREATED, Json(exercise)))
}

pub async fn get_exercise(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session, exercise)): Path<(String, String)>,
) -> Result<Json<ExerciseDetail>, ApiError> {
    let stats = state.workouts.exercise_stats(user.id, &session, &exercise)?;
    let lines = state.workouts.lines_of_exercise(user.id, &session, &exercise)?;

    Ok(Json(ExerciseDetail { stats, lines }))
}

pub async fn rename_exercise(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session, exercise)): Path<(String, String)>,
    JsonBody(request): JsonBody<NameRequest>,
) -> Result<Json<Exercise>, ApiError> {
    let form = NameForm::from(&request);
    Ok(Json(
        state
            .workouts
            .rename_exercise(user.id, &session, &exercise, &form)?,
    ))
}

pub async fn delete_exercise(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session, exercise)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .workouts
        .delete_exercise(user.id, &session, &exercise)?;
    Ok(StatusCode::NO_CONTENT)
}
