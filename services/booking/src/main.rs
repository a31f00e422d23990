use axum::{
    http::{Method, StatusCode},
    response::Json,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rizqtutor_auth::JwtService;
use rizqtutor_booking::config::AppConfig;
use rizqtutor_booking::handlers::AppState;
use rizqtutor_booking::routes;
use rizqtutor_common::{build_rate_limiter, ApiResponse};
use rizqtutor_database::create_pool;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rizqtutor_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let db_pool = create_pool(&config.database).await?;

    // Run migrations
    rizqtutor_database::run_migrations(&db_pool).await?;

    // Rate limiter backend is injected via configuration: in-process for a
    // single instance, redis for a scaled deployment
    let rate_limiter = build_rate_limiter(&config.rate_limit, &config.redis).await?;

    // Create JWT service for the session boundary
    let jwt_service = JwtService::new(&config.jwt.secret);

    // Build application state
    let app_state = AppState {
        db_pool,
        jwt_service,
        rate_limiter,
        config: config.clone(),
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any)
        .allow_origin(Any);

    // Build the application
    let app = routes::create_routes(&app_state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(app_state)
        .fallback(handler_404);

    // Start the server
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
            .await?;

    tracing::info!(
        "Booking service listening on {}:{}",
        config.server.host,
        config.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}

async fn handler_404() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error("Endpoint not found".to_string())),
    )
}
