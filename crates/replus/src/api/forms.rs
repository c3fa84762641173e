//! Request bodies.
//!
//! Form fields are taken as loose JSON values and handed to the core as text,
//! so a wrongly typed field becomes a field error instead of a body rejection.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use replus_core::{LineForm, NameForm};

use super::ApiError;

/// `Json` whose rejection is reported through [`ApiError`].
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NameRequest {
    pub name: Value,
}

impl From<&NameRequest> for NameForm {
    fn from(request: &NameRequest) -> Self {
        NameForm::new(as_text(&request.name))
    }
}

/// Fields may arrive as JSON strings or numbers.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LineRequest {
    pub weight: Value,
    pub reps: Value,
}

impl From<&LineRequest> for LineForm {
    fn from(request: &LineRequest) -> Self {
        LineForm::new(as_text(&request.weight), as_text(&request.reps))
    }
}
