use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use rizqtutor_auth::{JwtService, SessionUser};
use rizqtutor_common::{ApiResponse, AppError, RateLimiter};
use sqlx::PgPool;

use crate::availability::AvailabilityService;
use crate::config::AppConfig;
use crate::lifecycle::LessonService;
use crate::models::*;
use crate::notifications::NotificationService;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub config: AppConfig,
}

/// Maps a service error to the wire contract. State-precondition conflicts
/// surface as 404, token failures as a single generic 401; anything
/// unexpected is logged and collapsed to a plain 500.
fn error_response(context: &str, err: AppError) -> (StatusCode, Json<ApiResponse<()>>) {
    match err {
        AppError::Validation(msg) => (StatusCode::BAD_REQUEST, Json(ApiResponse::error(msg))),
        AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, Json(ApiResponse::error(msg))),
        AppError::Authorization(msg) => (StatusCode::FORBIDDEN, Json(ApiResponse::error(msg))),
        AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Json(ApiResponse::error(msg))),
        AppError::Conflict(msg) => (StatusCode::CONFLICT, Json(ApiResponse::error(msg))),
        AppError::RateLimited(msg) => {
            (StatusCode::TOO_MANY_REQUESTS, Json(ApiResponse::error(msg)))
        }
        err => {
            tracing::error!("{} error: {:?}", context, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Internal server error".to_string())),
            )
        }
    }
}

async fn enforce_rate_limit(
    state: &AppState,
    identifier: &str,
    max_requests: u32,
) -> Result<(), (StatusCode, Json<ApiResponse<()>>)> {
    match state.rate_limiter.allow(identifier, max_requests).await {
        Ok(true) => Ok(()),
        Ok(false) => Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::error("Too many requests".to_string())),
        )),
        Err(err) => Err(error_response("Rate limit", err)),
    }
}

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Booking service is healthy".to_string()))
}

// Public booking request (guest entry point)
pub async fn create_lesson_request(
    State(state): State<AppState>,
    Json(payload): Json<LessonRequestPayload>,
) -> Result<(StatusCode, Json<ApiResponse<LessonRequestCreated>>), (StatusCode, Json<ApiResponse<()>>)>
{
    if let Err(validation_errors) = payload.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "Validation error: {:?}",
                validation_errors
            ))),
        ));
    }

    // Keyed by tutor to stop a single tutor's inbox being spammed
    enforce_rate_limit(
        &state,
        &payload.tutor_id.to_string(),
        state.config.max_requests_per_minute,
    )
    .await?;

    let service = LessonService::new(state.db_pool.clone(), &state.config);

    match service.create_request(payload).await {
        Ok(lesson_id) => Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success(LessonRequestCreated { lesson_id })),
        )),
        Err(err) => Err(error_response("Lesson request", err)),
    }
}

// Tutor accepts or rejects a pending request
pub async fn decide_request(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(lesson_id): Path<Uuid>,
    Json(payload): Json<RequestActionPayload>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ApiResponse<()>>)> {
    let service = LessonService::new(state.db_pool.clone(), &state.config);

    let result = match payload.action {
        RequestAction::Accept => service.accept(session.user_id, lesson_id).await,
        RequestAction::Reject => service.reject(session.user_id, lesson_id).await,
    };

    match result {
        Ok(_) => Ok(Json(ApiResponse::success(
            "Lesson updated successfully".to_string(),
        ))),
        Err(err) => Err(error_response("Lesson decision", err)),
    }
}

// Tutor approves or declines a pending reschedule
pub async fn decide_reschedule(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<RescheduleActionPayload>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ApiResponse<()>>)> {
    let service = LessonService::new(state.db_pool.clone(), &state.config);
    let approve = payload.action == RescheduleAction::Approve;

    match service
        .decide_reschedule(session.user_id, request_id, approve)
        .await
    {
        Ok(_) => Ok(Json(ApiResponse::success(
            "Request updated successfully".to_string(),
        ))),
        Err(err) => Err(error_response("Reschedule decision", err)),
    }
}

// Tutor marks a confirmed lesson as held
pub async fn complete_lesson(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ApiResponse<()>>)> {
    let service = LessonService::new(state.db_pool.clone(), &state.config);

    match service.complete(session.user_id, lesson_id).await {
        Ok(_) => Ok(Json(ApiResponse::success(
            "Lesson marked as complete".to_string(),
        ))),
        Err(err) => Err(error_response("Lesson completion", err)),
    }
}

// Parent cancels via link token
pub async fn cancel_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
    Json(payload): Json<CancelPayload>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ApiResponse<()>>)> {
    if payload.validate().is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Token is required".to_string())),
        ));
    }

    let service = LessonService::new(state.db_pool.clone(), &state.config);

    match service
        .parent_cancel(lesson_id, &payload.token, payload.note)
        .await
    {
        Ok(_) => Ok(Json(ApiResponse::success(
            "Lesson canceled successfully".to_string(),
        ))),
        Err(err) => Err(error_response("Lesson cancel", err)),
    }
}

// Parent proposes a new time via link token
pub async fn reschedule_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ApiResponse<()>>)> {
    if payload.validate().is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Invalid input".to_string())),
        ));
    }

    let service = LessonService::new(state.db_pool.clone(), &state.config);

    match service
        .parent_reschedule(lesson_id, &payload.token, payload.proposed_time, payload.reason)
        .await
    {
        Ok(_) => Ok(Json(ApiResponse::success(
            "Reschedule requested successfully".to_string(),
        ))),
        Err(err) => Err(error_response("Lesson reschedule", err)),
    }
}

// Parent rates a completed lesson via link token
pub async fn rate_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
    Json(payload): Json<RatingPayload>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ApiResponse<()>>)> {
    // Keyed by lesson to stop brute-forcing a rating token
    enforce_rate_limit(
        &state,
        &lesson_id.to_string(),
        state.config.max_rating_attempts_per_minute,
    )
    .await?;

    if let Err(validation_errors) = payload.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "Validation error: {:?}",
                validation_errors
            ))),
        ));
    }

    let service = LessonService::new(state.db_pool.clone(), &state.config);

    match service
        .rate(lesson_id, &payload.token, payload.stars, payload.comment)
        .await
    {
        Ok(_) => Ok(Json(ApiResponse::success(
            "Rating submitted successfully".to_string(),
        ))),
        Err(err) => Err(error_response("Rating", err)),
    }
}

// Tutor's week grid: template slots plus live sessions
pub async fn get_availability(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<WeekView>>, (StatusCode, Json<ApiResponse<()>>)> {
    let service = AvailabilityService::new(state.db_pool.clone());

    match service.week_view(session.user_id).await {
        Ok(view) => Ok(Json(ApiResponse::success(view))),
        Err(err) => Err(error_response("Availability read", err)),
    }
}

// Replace the tutor's weekly template
pub async fn replace_availability(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Json(payload): Json<AvailabilityUpdatePayload>,
) -> Result<Json<ApiResponse<AvailabilityUpdated>>, (StatusCode, Json<ApiResponse<()>>)> {
    let service = AvailabilityService::new(state.db_pool.clone());

    match service
        .replace_weekly_template(session.user_id, &payload.slots)
        .await
    {
        Ok(count) => Ok(Json(ApiResponse::success(AvailabilityUpdated { count }))),
        Err(err) => Err(error_response("Availability write", err)),
    }
}

// Tutor notification feed
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<NotificationFeed>>, (StatusCode, Json<ApiResponse<()>>)> {
    match NotificationService::feed(&state.db_pool, session.user_id).await {
        Ok(feed) => Ok(Json(ApiResponse::success(feed))),
        Err(err) => Err(error_response("Notifications read", err)),
    }
}

pub async fn mark_notifications_read(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Json(payload): Json<NotificationsPatchPayload>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ApiResponse<()>>)> {
    match NotificationService::mark_read(&state.db_pool, session.user_id, &payload).await {
        Ok(_) => Ok(Json(ApiResponse::success("ok".to_string()))),
        Err(err) => Err(error_response("Notifications update", err)),
    }
}
