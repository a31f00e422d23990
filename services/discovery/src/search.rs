use sqlx::{PgPool, Postgres, QueryBuilder};

use rizqtutor_common::AppError;

use crate::models::{DiscoverQuery, PricedLessonType, RankedTutor, SortOrder, TutorCard, TutorProfileResponse};

/// Read-path search over active tutors. Filters compose as AND
/// conjunctions; ranking is a single ORDER BY chosen from the sort param.
#[derive(Clone)]
pub struct SearchService {
    db_pool: PgPool,
}

impl SearchService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn search(&self, query: &DiscoverQuery) -> Result<Vec<RankedTutor>, AppError> {
        let coordinates = query.coordinates();

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
              t.id, t.name, t.slug,
              tp.bio,
              COALESCE(trs.avg_stars, 0)::DECIMAL(3, 2) AS avg_stars,
              COALESCE(trs.rating_count, 0)::INTEGER AS rating_count,
              MIN(lp.price_amount)::DECIMAL(10, 2) AS min_price,
              MAX(lp.price_amount)::DECIMAL(10, 2) AS max_price,
            "#,
        );

        // Haversine distance over tutor coordinates, nulls-last when the
        // tutor has no pin or the caller sent no location
        match coordinates {
            Some((lat, lng)) => {
                builder.push(
                    r#"
              CASE WHEN t.latitude IS NOT NULL AND t.longitude IS NOT NULL THEN
                ROUND((
                  6371 * acos(
                    cos(radians("#,
                );
                builder.push_bind(lat);
                builder.push(r#"::float8)) * cos(radians(t.latitude::float8))
                    * cos(radians(t.longitude::float8) - radians("#);
                builder.push_bind(lng);
                builder.push(r#"::float8))
                    + sin(radians("#);
                builder.push_bind(lat);
                builder.push(
                    r#"::float8)) * sin(radians(t.latitude::float8))
                  )
                )::NUMERIC, 1)
              ELSE NULL END AS distance_km,
            "#,
                );
            }
            None => {
                builder.push("\n              NULL::DECIMAL AS distance_km,\n");
            }
        }

        builder.push(
            r#"
              COALESCE(
                json_agg(
                  DISTINCT jsonb_build_object('label', lt.label, 'category', lt.category)
                ) FILTER (WHERE lt.id IS NOT NULL), '[]'
              ) AS subjects,
              EXISTS (
                SELECT 1 FROM tutor_availability ta
                WHERE ta.tutor_id = t.id
                  AND ta.day_of_week = EXTRACT(DOW FROM NOW())::INTEGER
              ) AS available_today
            FROM tutors t
            LEFT JOIN tutor_profiles tp ON t.id = tp.tutor_id
            LEFT JOIN tutor_rating_summary trs ON t.id = trs.tutor_id
            LEFT JOIN lesson_types lt ON t.id = lt.tutor_id AND lt.active = true
            LEFT JOIN lesson_pricing lp ON lt.id = lp.lesson_type_id AND lp.active = true
            WHERE t.is_active = true
            "#,
        );

        if let Some(category) = query.parsed_category() {
            builder.push(" AND lt.category = ");
            builder.push_bind(category);
        }

        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            builder.push(" AND t.name ILIKE ");
            builder.push_bind(format!("%{}%", q));
        }

        if let Some(min_rating) = query.min_rating.filter(|r| *r > 0.0) {
            builder.push(" AND COALESCE(trs.avg_stars, 0) >= ");
            builder.push_bind(min_rating);
            builder.push("::NUMERIC");
        }

        // Template existence for today's weekday, not remaining capacity
        if query.available_today {
            builder.push(
                r#" AND EXISTS (
                SELECT 1 FROM tutor_availability ta
                WHERE ta.tutor_id = t.id
                  AND ta.day_of_week = EXTRACT(DOW FROM NOW())::INTEGER
            )"#,
            );
        }

        builder.push(
            " GROUP BY t.id, t.name, t.slug, tp.bio, trs.avg_stars, trs.rating_count",
        );

        let order_by = match query.sort {
            SortOrder::PriceAsc => "min_price ASC NULLS LAST",
            SortOrder::PriceDesc => "min_price DESC NULLS LAST",
            SortOrder::Distance => "distance_km ASC NULLS LAST",
            SortOrder::Rating => "COALESCE(trs.avg_stars, 0) DESC, trs.rating_count DESC",
        };
        builder.push(" ORDER BY ");
        builder.push(order_by);
        builder.push(" LIMIT 50");

        builder
            .build_query_as::<RankedTutor>()
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    /// Public tutor page: the profile card plus the active price list the
    /// booking form is built from.
    pub async fn tutor_profile(&self, slug: &str) -> Result<TutorProfileResponse, AppError> {
        let tutor = sqlx::query_as::<_, TutorCard>(
            r#"
            SELECT
              t.id, t.name, t.slug,
              tp.bio,
              COALESCE(tp.lesson_formats, ARRAY[]::TEXT[]) AS lesson_formats,
              COALESCE(tp.levels_supported, ARRAY[]::TEXT[]) AS levels_supported,
              COALESCE(trs.avg_stars, 0)::DECIMAL(3, 2) AS avg_stars,
              COALESCE(trs.rating_count, 0)::INTEGER AS rating_count,
              t.created_at
            FROM tutors t
            LEFT JOIN tutor_profiles tp ON t.id = tp.tutor_id
            LEFT JOIN tutor_rating_summary trs ON t.id = trs.tutor_id
            WHERE t.slug = $1 AND t.is_active = true
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Tutor not found".to_string()))?;

        let lesson_types = sqlx::query_as::<_, PricedLessonType>(
            r#"
            SELECT lt.id, lt.category, lt.label, lp.duration_minutes, lp.price_amount, lp.currency
            FROM lesson_types lt
            JOIN lesson_pricing lp ON lp.lesson_type_id = lt.id
            WHERE lt.tutor_id = $1 AND lt.active = true AND lp.active = true
            ORDER BY lt.label, lp.duration_minutes
            "#,
        )
        .bind(tutor.id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let service_areas = sqlx::query_as::<_, rizqtutor_database::TutorServiceArea>(
            r#"
            SELECT id, tutor_id, district_id, district_label, latitude, longitude, created_at
            FROM tutor_service_areas
            WHERE tutor_id = $1
            ORDER BY district_label
            "#,
        )
        .bind(tutor.id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(TutorProfileResponse {
            tutor,
            lesson_types,
            service_areas,
        })
    }
}
