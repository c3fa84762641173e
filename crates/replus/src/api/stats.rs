use axum::extract::State;
use axum::response::Json;

use replus_core::UserStats;

use crate::auth::AuthUser;

use super::{ApiError, AppState};

pub async fn get_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.workouts.user_stats(user.id)?))
}
