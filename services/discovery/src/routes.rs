use axum::{routing::get, Router};

use crate::handlers::{self, AppState};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/public/discover", get(handlers::discover))
        .route("/public/tutors/:slug", get(handlers::tutor_by_slug))
}
