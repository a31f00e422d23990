use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use rizqtutor_auth::require_tutor_session;

use crate::handlers::{self, AppState};

pub fn create_routes(state: &AppState) -> Router<AppState> {
    // Tutor-actor routes sit behind the session boundary; ownership of the
    // targeted lesson is still enforced in SQL by each operation.
    let tutor_routes = Router::new()
        .route("/tutor/requests/:lesson_id", post(handlers::decide_request))
        .route(
            "/tutor/reschedules/:request_id",
            post(handlers::decide_reschedule),
        )
        .route(
            "/tutor/lessons/:lesson_id/complete",
            post(handlers::complete_lesson),
        )
        .route(
            "/tutor/availability",
            get(handlers::get_availability).post(handlers::replace_availability),
        )
        .route(
            "/tutor/notifications",
            get(handlers::list_notifications).patch(handlers::mark_notifications_read),
        )
        .layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            require_tutor_session,
        ));

    // Parent-actor routes are public: a valid purpose-matched link token is
    // the authorization, not a session.
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/public/lesson-requests", post(handlers::create_lesson_request))
        .route("/public/lessons/:lesson_id/cancel", post(handlers::cancel_lesson))
        .route(
            "/public/lessons/:lesson_id/reschedule",
            post(handlers::reschedule_lesson),
        )
        .route("/public/lessons/:lesson_id/rate", post(handlers::rate_lesson))
        .merge(tutor_routes)
}
