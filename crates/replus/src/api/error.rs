use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use replus_core::{FieldErrors, WorkoutError};
use serde_json::json;

use crate::auth::AuthError;

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Workout(WorkoutError),
    Auth(AuthError),
    /// The request body was not the JSON object the handler expects.
    Body(JsonRejection),
}

impl From<WorkoutError> for ApiError {
    fn from(err: WorkoutError) -> Self {
        ApiError::Workout(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

fn field_errors(status: StatusCode, errors: &FieldErrors) -> Response {
    (status, Json(json!({ "errors": errors }))).into_response()
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

fn internal(err: &dyn std::error::Error) -> Response {
    tracing::error!(error = %err, "Request failed");
    detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Workout(err) => match &err {
                WorkoutError::DuplicateName { .. } => field_errors(
                    StatusCode::CONFLICT,
                    &err.field_errors().unwrap_or_default(),
                ),
                WorkoutError::Validation(errors) => {
                    field_errors(StatusCode::UNPROCESSABLE_ENTITY, errors)
                }
                WorkoutError::NotFound(_) => detail(StatusCode::NOT_FOUND, err.to_string()),
                WorkoutError::Store(_) => internal(&err),
            },
            ApiError::Auth(err) => match &err {
                AuthError::MissingCredentials | AuthError::InvalidToken => {
                    detail(StatusCode::UNAUTHORIZED, err.to_string())
                }
                AuthError::BadCredentials => field_errors(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &FieldErrors::single("__all__", err.to_string()),
                ),
                AuthError::Validation(errors) => {
                    field_errors(StatusCode::UNPROCESSABLE_ENTITY, errors)
                }
                AuthError::Hash(_) | AuthError::Store(_) => internal(&err),
            },
            ApiError::Body(rejection) => field_errors(
                rejection.status(),
                &FieldErrors::single("__all__", rejection.body_text()),
            ),
        }
    }
}
