use rizqtutor_common::AppError;
use sqlx::PgPool;

pub struct MigrationRunner {
    pool: PgPool,
}

#[derive(Debug)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
    pub is_up_to_date: bool,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} migrations applied, {} pending",
            self.applied, self.total, self.pending
        )
    }
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_all_migrations(&self) -> Result<(), AppError> {
        tracing::info!("Starting database migrations...");

        let migrator = sqlx::migrate!("./migrations");
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

        tracing::info!("All migrations completed successfully");
        Ok(())
    }

    pub async fn check_migration_status(&self) -> Result<MigrationStatus, AppError> {
        use sqlx::migrate::Migrate;

        let migrator = sqlx::migrate!("./migrations");
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        let applied = conn
            .list_applied_migrations()
            .await
            .map_err(|e| AppError::Internal(format!("Migration status failed: {}", e)))?;

        let total = migrator.migrations.len();
        let applied_count = applied.len();
        let pending = total - applied_count;

        Ok(MigrationStatus {
            total,
            applied: applied_count,
            pending,
            is_up_to_date: pending == 0,
        })
    }

    /// Seeds one demo tutor with a profile, pricing, availability and a
    /// default cancellation policy. No-op when tutors already exist.
    pub async fn seed_initial_data(&self) -> Result<(), AppError> {
        let tutor_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tutors")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if tutor_count > 0 {
            tracing::info!("Seed skipped: tutors already present");
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let tutor_id: uuid::Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO tutors (name, phone, slug, latitude, longitude)
            VALUES ('Farah Al-Fayad', '+9613123456', 'farah-fayad', 33.8938, 35.5018)
            RETURNING id
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        sqlx::query(
            r#"
            INSERT INTO tutor_profiles (tutor_id, bio, lesson_formats, levels_supported)
            VALUES ($1, 'Experienced and patient tutor specializing in Math and Music for all ages.',
                    ARRAY['individual'], ARRAY['Beginner', 'Intermediate', 'Advanced'])
            "#,
        )
        .bind(tutor_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        sqlx::query("INSERT INTO cancellation_policy (tutor_id) VALUES ($1)")
            .bind(tutor_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        sqlx::query("INSERT INTO tutor_rating_summary (tutor_id) VALUES ($1)")
            .bind(tutor_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let lesson_type_id: uuid::Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO lesson_types (tutor_id, category, label)
            VALUES ($1, 'academic', 'Math')
            RETURNING id
            "#,
        )
        .bind(tutor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        sqlx::query(
            r#"
            INSERT INTO lesson_pricing (lesson_type_id, duration_minutes, price_amount)
            VALUES ($1, 30, 15.00), ($1, 45, 20.00), ($1, 60, 25.00)
            "#,
        )
        .bind(lesson_type_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        // Weekday afternoons, 1-hour slots
        sqlx::query(
            r#"
            INSERT INTO tutor_availability (tutor_id, day_of_week, start_time_local, end_time_local)
            SELECT $1, dow, (hour || ':00')::TIME, (hour + 1 || ':00')::TIME
            FROM generate_series(1, 5) AS dow, generate_series(15, 18) AS hour
            "#,
        )
        .bind(tutor_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Seeded demo tutor {}", tutor_id);
        Ok(())
    }
}
