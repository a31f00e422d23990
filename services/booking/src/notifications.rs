use sqlx::{Acquire, PgPool, Postgres, Transaction};
use uuid::Uuid;

use rizqtutor_common::AppError;
use rizqtutor_database::TutorNotification;

use crate::models::{NotificationFeed, NotificationsPatchPayload};

pub struct NotificationService;

impl NotificationService {
    /// Best-effort notification write inside a savepoint. A failure here
    /// (table missing, constraint hiccup) is logged and swallowed — it must
    /// never roll back the booking transition that carries it.
    pub async fn record_best_effort(
        tx: &mut Transaction<'_, Postgres>,
        tutor_id: Uuid,
        lesson_id: Option<Uuid>,
        kind: &str,
        title: &str,
        body: &str,
    ) {
        if let Err(err) = Self::insert_scoped(tx, tutor_id, lesson_id, kind, title, body).await {
            tracing::warn!(
                %tutor_id,
                kind,
                error = %err,
                "tutor notification insert failed, continuing without it"
            );
        }
    }

    async fn insert_scoped(
        tx: &mut Transaction<'_, Postgres>,
        tutor_id: Uuid,
        lesson_id: Option<Uuid>,
        kind: &str,
        title: &str,
        body: &str,
    ) -> Result<(), AppError> {
        let mut savepoint = tx.begin().await.map_err(AppError::Database)?;

        sqlx::query(
            "INSERT INTO tutor_notifications (tutor_id, type, title, body, lesson_id) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(tutor_id)
        .bind(kind)
        .bind(title)
        .bind(body)
        .bind(lesson_id)
        .execute(&mut *savepoint)
        .await
        .map_err(AppError::Database)?;

        savepoint.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    /// Newest-first feed for the tutor, capped at 50.
    pub async fn feed(pool: &PgPool, tutor_id: Uuid) -> Result<NotificationFeed, AppError> {
        let notifications = sqlx::query_as::<_, TutorNotification>(
            r#"
            SELECT id, tutor_id, type, title, body, lesson_id, read, created_at
            FROM tutor_notifications
            WHERE tutor_id = $1
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(tutor_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let unread_count = notifications.iter().filter(|n| !n.read).count();

        Ok(NotificationFeed {
            notifications,
            unread_count,
        })
    }

    pub async fn mark_read(
        pool: &PgPool,
        tutor_id: Uuid,
        payload: &NotificationsPatchPayload,
    ) -> Result<(), AppError> {
        if payload.all {
            sqlx::query("UPDATE tutor_notifications SET read = true WHERE tutor_id = $1")
                .bind(tutor_id)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;
        } else if !payload.ids.is_empty() {
            sqlx::query(
                "UPDATE tutor_notifications SET read = true WHERE tutor_id = $1 AND id = ANY($2)",
            )
            .bind(tutor_id)
            .bind(&payload.ids)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        }

        Ok(())
    }
}
