mod error;
mod exercises;
mod forms;
mod lines;
mod sessions;
mod stats;
mod users;

pub use error::ApiError;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use chrono::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use replus_core::WorkoutService;
use replus_db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub workouts: WorkoutService<Database>,
    /// How long an issued token stays valid.
    pub token_ttl: Duration,
}

impl AppState {
    pub fn new(db: Arc<Database>, token_ttl: Duration) -> Self {
        Self {
            workouts: WorkoutService::from_shared(Arc::clone(&db)),
            db,
            token_ttl,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(users::health))
        .route("/api/home", get(users::home))
        .route("/api/auth/register", post(users::register))
        .route("/api/auth/login", post(users::login))
        .route("/api/auth/logout", post(users::logout))
        .route(
            "/api/auth/me",
            get(users::me).delete(users::delete_account),
        )
        .route(
            "/api/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/api/sessions/{session}",
            get(sessions::get_session)
                .patch(sessions::rename_session)
                .delete(sessions::delete_session),
        )
        .route(
            "/api/sessions/{session}/exercises",
            get(exercises::list_exercises).post(exercises::create_exercise),
        )
        .route(
            "/api/sessions/{session}/exercises/{exercise}",
            get(exercises::get_exercise)
                .patch(exercises::rename_exercise)
                .delete(exercises::delete_exercise),
        )
        .route(
            "/api/sessions/{session}/exercises/{exercise}/lines",
            get(lines::list_lines).post(lines::log_line),
        )
        .route(
            "/api/sessions/{session}/exercises/{exercise}/lines/{line}",
            delete(lines::delete_line),
        )
        .route("/api/stats", get(stats::get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
