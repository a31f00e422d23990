use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use sqlx::PgPool;

use rizqtutor_common::{ApiResponse, AppError};

use crate::config::AppConfig;
use crate::models::{DiscoverQuery, DiscoverResponse, TutorProfileResponse};
use crate::search::SearchService;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: AppConfig,
}

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success(
        "Discovery service is healthy".to_string(),
    ))
}

// Public tutor search — no auth required for browsing
pub async fn discover(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> Result<Json<ApiResponse<DiscoverResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let service = SearchService::new(state.db_pool.clone());

    match service.search(&query).await {
        Ok(tutors) => Ok(Json(ApiResponse::success(DiscoverResponse { tutors }))),
        Err(err) => {
            tracing::error!("Discover error: {:?}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Internal server error".to_string())),
            ))
        }
    }
}

// Public tutor page by slug
pub async fn tutor_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<TutorProfileResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let service = SearchService::new(state.db_pool.clone());

    match service.tutor_profile(&slug).await {
        Ok(profile) => Ok(Json(ApiResponse::success(profile))),
        Err(AppError::NotFound(msg)) => {
            Err((StatusCode::NOT_FOUND, Json(ApiResponse::error(msg))))
        }
        Err(err) => {
            tracing::error!("Tutor profile error: {:?}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Internal server error".to_string())),
            ))
        }
    }
}
