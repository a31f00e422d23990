//! Discovery search tests against a real PostgreSQL database.
//!
//! Run with a database available:
//!   DATABASE_NAME=rizqtutor_test cargo test -p rizqtutor-discovery -- --ignored

use axum_test::TestServer;
use sqlx::PgPool;
use uuid::Uuid;

use rizqtutor_common::{DatabaseConfig, ServerConfig};
use rizqtutor_database::{create_pool, run_migrations};
use rizqtutor_discovery::config::AppConfig;
use rizqtutor_discovery::handlers::AppState;
use rizqtutor_discovery::routes::create_routes;

async fn setup() -> (TestServer, PgPool) {
    let mut database = DatabaseConfig::from_env();
    if std::env::var("DATABASE_NAME").is_err() {
        database.database = "rizqtutor_test".to_string();
    }

    let config = AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
        },
        database,
    };

    let pool = create_pool(&config.database).await.expect("test database");
    run_migrations(&pool).await.expect("migrations");

    let state = AppState {
        db_pool: pool.clone(),
        config,
    };

    let server = TestServer::new(create_routes().with_state(state)).expect("test server");
    (server, pool)
}

/// Seeds a tutor with one priced lesson type and a rating summary row.
async fn seed_tutor(pool: &PgPool, name: &str, avg_stars: &str, rating_count: i32) -> (Uuid, String) {
    let marker = Uuid::new_v4().simple().to_string();
    let slug = format!("{}-{}", name.to_lowercase().replace(' ', "-"), &marker[..8]);

    let tutor_id: Uuid = sqlx::query_scalar(
        "INSERT INTO tutors (phone, name, slug) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("+961{}", &marker[..8]))
    .bind(name)
    .bind(&slug)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO tutor_profiles (tutor_id, bio) VALUES ($1, 'bio')")
        .bind(tutor_id)
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO tutor_rating_summary (tutor_id, avg_stars, rating_count) VALUES ($1, $2::DECIMAL, $3)",
    )
    .bind(tutor_id)
    .bind(avg_stars)
    .bind(rating_count)
    .execute(pool)
    .await
    .unwrap();

    let lesson_type_id: Uuid = sqlx::query_scalar(
        "INSERT INTO lesson_types (tutor_id, category, label) VALUES ($1, 'music', 'Piano') RETURNING id",
    )
    .bind(tutor_id)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO lesson_pricing (lesson_type_id, duration_minutes, price_amount) VALUES ($1, 60, 30.00)",
    )
    .bind(lesson_type_id)
    .execute(pool)
    .await
    .unwrap();

    (tutor_id, slug)
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn search_filters_by_name_and_min_rating() {
    let (server, pool) = setup().await;
    let marker = Uuid::new_v4().simple().to_string();
    let strong_name = format!("Strong {}", &marker[..6]);
    let weak_name = format!("Weak {}", &marker[..6]);

    seed_tutor(&pool, &strong_name, "4.80", 12).await;
    seed_tutor(&pool, &weak_name, "2.10", 3).await;

    let response = server
        .get("/public/discover")
        .add_query_param("q", &marker[..6])
        .add_query_param("minRating", "4.0")
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let tutors = body["data"]["tutors"].as_array().unwrap();
    assert_eq!(tutors.len(), 1);
    assert_eq!(tutors[0]["name"], strong_name);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn search_ranks_by_rating_by_default() {
    let (server, pool) = setup().await;
    let marker = Uuid::new_v4().simple().to_string();
    let low_name = format!("Low {}", &marker[..6]);
    let high_name = format!("High {}", &marker[..6]);

    seed_tutor(&pool, &low_name, "3.00", 5).await;
    seed_tutor(&pool, &high_name, "4.90", 8).await;

    let response = server
        .get("/public/discover")
        .add_query_param("q", &marker[..6])
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let tutors = body["data"]["tutors"].as_array().unwrap();
    assert_eq!(tutors.len(), 2);
    assert_eq!(tutors[0]["name"], high_name);
    assert_eq!(tutors[1]["name"], low_name);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn available_today_requires_a_template_slot_for_todays_weekday() {
    let (server, pool) = setup().await;
    let marker = Uuid::new_v4().simple().to_string();
    let free_name = format!("Free {}", &marker[..6]);
    let busy_name = format!("Busy {}", &marker[..6]);

    let (free_id, _) = seed_tutor(&pool, &free_name, "4.00", 1).await;
    seed_tutor(&pool, &busy_name, "4.00", 1).await;

    // Give only one tutor a slot on today's weekday
    sqlx::query(
        r#"
        INSERT INTO tutor_availability (tutor_id, day_of_week, start_time_local, end_time_local)
        VALUES ($1, EXTRACT(DOW FROM NOW())::INTEGER, '09:00', '10:00')
        "#,
    )
    .bind(free_id)
    .execute(&pool)
    .await
    .unwrap();

    let response = server
        .get("/public/discover")
        .add_query_param("q", &marker[..6])
        .add_query_param("availableToday", "true")
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let tutors = body["data"]["tutors"].as_array().unwrap();
    assert_eq!(tutors.len(), 1);
    assert_eq!(tutors[0]["name"], free_name);
    assert!(tutors[0]["availableToday"].as_bool().unwrap());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn tutor_page_serves_the_price_list_and_misses_cleanly() {
    let (server, pool) = setup().await;
    let (_, slug) = seed_tutor(&pool, "Page Tutor", "4.50", 2).await;

    let response = server.get(&format!("/public/tutors/{}", slug)).await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["tutor"]["slug"], slug);
    let lesson_types = body["data"]["lessonTypes"].as_array().unwrap();
    assert_eq!(lesson_types.len(), 1);
    assert_eq!(lesson_types[0]["durationMinutes"], 60);

    server
        .get("/public/tutors/no-such-tutor")
        .await
        .assert_status_not_found();
}
