use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use rizqtutor_common::AppError;
use rizqtutor_database::{LessonStatus, RescheduleStatus, TokenPurpose};

use crate::config::AppConfig;
use crate::models::LessonRequestPayload;
use crate::notifications::NotificationService;
use crate::tokens::TokenService;

const INVALID_TOKEN: &str = "Invalid or expired token";
const LESSON_NOT_ACTIONABLE: &str = "Lesson not found or action not allowed";
const REQUEST_NOT_ACTIONABLE: &str = "Request not found or action not allowed";

/// Every lesson status transition in the system. All entry points route
/// through [`apply_transition`] so the precondition is re-checked inside
/// the transaction rather than replicated per handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Accept,
    Reject,
    ParentCancel,
    ParentReschedule,
    ApproveReschedule,
    DeclineReschedule,
    Complete,
}

impl LifecycleEvent {
    pub fn from_status(&self) -> LessonStatus {
        match self {
            LifecycleEvent::Accept | LifecycleEvent::Reject => LessonStatus::Requested,
            LifecycleEvent::ParentCancel
            | LifecycleEvent::ParentReschedule
            | LifecycleEvent::Complete => LessonStatus::Confirmed,
            LifecycleEvent::ApproveReschedule | LifecycleEvent::DeclineReschedule => {
                LessonStatus::RescheduleRequested
            }
        }
    }

    pub fn to_status(&self) -> LessonStatus {
        match self {
            LifecycleEvent::Accept
            | LifecycleEvent::ApproveReschedule
            | LifecycleEvent::DeclineReschedule => LessonStatus::Confirmed,
            LifecycleEvent::Reject | LifecycleEvent::ParentCancel => LessonStatus::Canceled,
            LifecycleEvent::ParentReschedule => LessonStatus::RescheduleRequested,
            LifecycleEvent::Complete => LessonStatus::Completed,
        }
    }

    /// What the transition does to `confirmed_start_at_utc`. The column is
    /// set exactly while the lesson is confirmed, completed or awaiting a
    /// reschedule decision.
    fn start_at_change(&self, new_start: Option<DateTime<Utc>>) -> StartAtChange {
        match self {
            LifecycleEvent::Accept | LifecycleEvent::ApproveReschedule => match new_start {
                Some(ts) => StartAtChange::Set(ts),
                None => StartAtChange::Keep,
            },
            LifecycleEvent::ParentCancel => StartAtChange::Clear,
            _ => StartAtChange::Keep,
        }
    }
}

enum StartAtChange {
    Keep,
    Set(DateTime<Utc>),
    Clear,
}

/// Conditional-update transition: `WHERE status = <from>` is the
/// serialization point. Returns affected rows; zero means the precondition
/// no longer held (wrong status, wrong owner, or a concurrent writer won)
/// and the caller must report the conflict, never retry.
pub async fn apply_transition(
    tx: &mut Transaction<'_, Postgres>,
    lesson_id: Uuid,
    owning_tutor: Option<Uuid>,
    event: LifecycleEvent,
    new_start: Option<DateTime<Utc>>,
) -> Result<u64, AppError> {
    let from = event.from_status();
    let to = event.to_status();

    let result = match event.start_at_change(new_start) {
        StartAtChange::Set(ts) => {
            sqlx::query(
                r#"
                UPDATE lessons
                SET status = $1, confirmed_start_at_utc = $2, updated_at = NOW()
                WHERE id = $3 AND status = $4 AND ($5::uuid IS NULL OR tutor_id = $5)
                "#,
            )
            .bind(to)
            .bind(ts)
            .bind(lesson_id)
            .bind(from)
            .bind(owning_tutor)
            .execute(&mut **tx)
            .await
        }
        StartAtChange::Clear => {
            sqlx::query(
                r#"
                UPDATE lessons
                SET status = $1, confirmed_start_at_utc = NULL, updated_at = NOW()
                WHERE id = $2 AND status = $3 AND ($4::uuid IS NULL OR tutor_id = $4)
                "#,
            )
            .bind(to)
            .bind(lesson_id)
            .bind(from)
            .bind(owning_tutor)
            .execute(&mut **tx)
            .await
        }
        StartAtChange::Keep => {
            sqlx::query(
                r#"
                UPDATE lessons
                SET status = $1, updated_at = NOW()
                WHERE id = $2 AND status = $3 AND ($4::uuid IS NULL OR tutor_id = $4)
                "#,
            )
            .bind(to)
            .bind(lesson_id)
            .bind(from)
            .bind(owning_tutor)
            .execute(&mut **tx)
            .await
        }
    };

    Ok(result.map_err(AppError::Database)?.rows_affected())
}

/// A cancellation is late when it lands closer to the confirmed start than
/// the tutor's cutoff allows. Strictly less-than: exactly at the cutoff is
/// still on time.
pub fn is_late_cancellation(
    now: DateTime<Utc>,
    confirmed_start_at: DateTime<Utc>,
    cutoff_hours: i32,
) -> bool {
    let hours_until_lesson =
        (confirmed_start_at - now).num_milliseconds() as f64 / (1000.0 * 60.0 * 60.0);
    hours_until_lesson < cutoff_hours as f64
}

#[derive(Clone)]
pub struct LessonService {
    db_pool: PgPool,
    base_url: String,
}

impl LessonService {
    pub fn new(db_pool: PgPool, config: &AppConfig) -> Self {
        Self {
            db_pool,
            base_url: config.base_url.clone(),
        }
    }

    /// Public booking entry point. The price is resolved from the active
    /// price list, never taken from the client. The tutor notification is
    /// best-effort: its failure never aborts the booking.
    pub async fn create_request(&self, payload: LessonRequestPayload) -> Result<Uuid, AppError> {
        let price: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT lp.price_amount FROM lesson_pricing lp
            JOIN lesson_types lt ON lp.lesson_type_id = lt.id
            WHERE lp.lesson_type_id = $1
              AND lp.duration_minutes = $2
              AND lt.tutor_id = $3
              AND lp.active = true
              AND lt.active = true
            "#,
        )
        .bind(payload.lesson_type_id)
        .bind(payload.duration)
        .bind(payload.tutor_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let price_amount = price.ok_or_else(|| {
            AppError::Validation("Invalid lesson or pricing details provided.".to_string())
        })?;

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let lesson_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO lessons
                (tutor_id, lesson_type_id, student_name, level, note, duration_minutes,
                 price_amount, requested_start_at_utc, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'requested')
            RETURNING id
            "#,
        )
        .bind(payload.tutor_id)
        .bind(payload.lesson_type_id)
        .bind(&payload.student_name)
        .bind(&payload.level)
        .bind(&payload.note)
        .bind(payload.duration)
        .bind(price_amount)
        .bind(payload.requested_start_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        sqlx::query("INSERT INTO lesson_payments (lesson_id, payment_status) VALUES ($1, 'unpaid')")
            .bind(lesson_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let mut body = format!(
            "{} requested a {}-minute lesson starting {}",
            payload.student_name, payload.duration, payload.requested_start_at
        );
        if let Some(district) = payload.district.as_deref() {
            body.push_str(&format!(" ({})", district));
        }
        NotificationService::record_best_effort(
            &mut tx,
            payload.tutor_id,
            Some(lesson_id),
            "new_request",
            "New lesson request",
            &body,
        )
        .await;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(%lesson_id, tutor_id = %payload.tutor_id, "lesson requested");
        Ok(lesson_id)
    }

    /// Tutor accepts a pending request: requested -> confirmed, the
    /// requested time becomes the confirmed time, and the parent's cancel
    /// and reschedule tokens are issued, both expiring at lesson start.
    pub async fn accept(&self, tutor_id: Uuid, lesson_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let requested_start: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT requested_start_at_utc FROM lessons WHERE id = $1 AND tutor_id = $2 AND status = 'requested'",
        )
        .bind(lesson_id)
        .bind(tutor_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let requested_start = requested_start
            .ok_or_else(|| AppError::NotFound(LESSON_NOT_ACTIONABLE.to_string()))?;

        let rows = apply_transition(
            &mut tx,
            lesson_id,
            Some(tutor_id),
            LifecycleEvent::Accept,
            Some(requested_start),
        )
        .await?;
        if rows == 0 {
            return Err(AppError::NotFound(LESSON_NOT_ACTIONABLE.to_string()));
        }

        // Tokens expire when the lesson is supposed to start
        let cancel_token =
            TokenService::issue(&mut tx, lesson_id, TokenPurpose::Cancel, requested_start).await?;
        let reschedule_token =
            TokenService::issue(&mut tx, lesson_id, TokenPurpose::Reschedule, requested_start)
                .await?;

        tx.commit().await.map_err(AppError::Database)?;

        // Stand-in for the SMS/WhatsApp send to the parent
        tracing::info!(
            %lesson_id,
            cancel_link = %format!("{}/l/{}/cancel/{}", self.base_url, lesson_id, cancel_token),
            reschedule_link = %format!("{}/l/{}/reschedule/{}", self.base_url, lesson_id, reschedule_token),
            "lesson accepted, parent action links issued"
        );
        Ok(())
    }

    /// Tutor rejects a pending request: requested -> canceled with a
    /// tutor-attributed, never-late cancellation record.
    pub async fn reject(&self, tutor_id: Uuid, lesson_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let rows =
            apply_transition(&mut tx, lesson_id, Some(tutor_id), LifecycleEvent::Reject, None)
                .await?;
        if rows == 0 {
            return Err(AppError::NotFound(LESSON_NOT_ACTIONABLE.to_string()));
        }

        sqlx::query(
            "INSERT INTO lesson_cancellations (lesson_id, canceled_by, is_late) VALUES ($1, 'tutor', false)",
        )
        .bind(lesson_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(%lesson_id, %tutor_id, "lesson rejected");
        Ok(())
    }

    /// Parent cancels a confirmed lesson via their single-use cancel token.
    /// Lateness is computed against the tutor's cutoff policy at the moment
    /// of cancellation; the token is invalidated in the same transaction.
    pub async fn parent_cancel(
        &self,
        lesson_id: Uuid,
        token: &str,
        note: Option<String>,
    ) -> Result<(), AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let redeemable = TokenService::find_redeemable(
            &mut tx,
            token,
            TokenPurpose::Cancel,
            lesson_id,
            LessonStatus::Confirmed,
        )
        .await?
        .ok_or_else(|| AppError::Authentication(INVALID_TOKEN.to_string()))?;

        let confirmed_start = redeemable
            .confirmed_start_at_utc
            .ok_or_else(|| AppError::Authentication(INVALID_TOKEN.to_string()))?;

        let cutoff_hours: i32 = sqlx::query_scalar(
            "SELECT cutoff_hours FROM cancellation_policy WHERE tutor_id = $1",
        )
        .bind(redeemable.tutor_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .unwrap_or(24);

        let is_late = is_late_cancellation(Utc::now(), confirmed_start, cutoff_hours);

        let rows =
            apply_transition(&mut tx, lesson_id, None, LifecycleEvent::ParentCancel, None).await?;
        if rows == 0 {
            return Err(AppError::Authentication(INVALID_TOKEN.to_string()));
        }

        sqlx::query(
            "INSERT INTO lesson_cancellations (lesson_id, canceled_by, is_late, note) VALUES ($1, 'parent', $2, $3)",
        )
        .bind(lesson_id)
        .bind(is_late)
        .bind(&note)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if TokenService::mark_used(&mut tx, redeemable.token_id).await? == 0 {
            return Err(AppError::Authentication(INVALID_TOKEN.to_string()));
        }

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(%lesson_id, is_late, "lesson canceled by parent");
        Ok(())
    }

    /// Parent proposes a new time via their reschedule token: confirmed ->
    /// reschedule_requested plus a pending request row for the tutor to
    /// decide. The status gate is what keeps at most one request pending.
    pub async fn parent_reschedule(
        &self,
        lesson_id: Uuid,
        token: &str,
        proposed_time: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<(), AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let redeemable = TokenService::find_redeemable(
            &mut tx,
            token,
            TokenPurpose::Reschedule,
            lesson_id,
            LessonStatus::Confirmed,
        )
        .await?
        .ok_or_else(|| AppError::Authentication(INVALID_TOKEN.to_string()))?;

        let rows = apply_transition(
            &mut tx,
            lesson_id,
            None,
            LifecycleEvent::ParentReschedule,
            None,
        )
        .await?;
        if rows == 0 {
            return Err(AppError::Authentication(INVALID_TOKEN.to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO reschedule_requests (lesson_id, requested_by, status, proposed_start_at_utc, reason)
            VALUES ($1, 'parent', 'pending', $2, $3)
            "#,
        )
        .bind(lesson_id)
        .bind(proposed_time)
        .bind(&reason)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if TokenService::mark_used(&mut tx, redeemable.token_id).await? == 0 {
            return Err(AppError::Authentication(INVALID_TOKEN.to_string()));
        }

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(%lesson_id, %proposed_time, "reschedule requested by parent");
        Ok(())
    }

    /// Tutor decides a pending reschedule. Approval moves the confirmed
    /// time to the proposal; decline restores plain confirmed status with
    /// the original time untouched.
    pub async fn decide_reschedule(
        &self,
        tutor_id: Uuid,
        request_id: Uuid,
        approve: bool,
    ) -> Result<(), AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let pending: Option<(Uuid, Option<DateTime<Utc>>)> = sqlx::query_as(
            r#"
            SELECT rr.lesson_id, rr.proposed_start_at_utc
            FROM reschedule_requests rr
            JOIN lessons l ON rr.lesson_id = l.id
            WHERE rr.id = $1 AND l.tutor_id = $2 AND rr.status = 'pending'
            "#,
        )
        .bind(request_id)
        .bind(tutor_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let (lesson_id, proposed_start) =
            pending.ok_or_else(|| AppError::NotFound(REQUEST_NOT_ACTIONABLE.to_string()))?;

        let decision = if approve {
            RescheduleStatus::Approved
        } else {
            RescheduleStatus::Declined
        };

        let decided = sqlx::query(
            "UPDATE reschedule_requests SET status = $1, updated_at = NOW() WHERE id = $2 AND status = 'pending'",
        )
        .bind(decision)
        .bind(request_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;
        if decided.rows_affected() == 0 {
            return Err(AppError::NotFound(REQUEST_NOT_ACTIONABLE.to_string()));
        }

        let rows = if approve {
            let proposed = proposed_start.ok_or_else(|| {
                AppError::Validation("Reschedule request has no proposed time".to_string())
            })?;
            apply_transition(
                &mut tx,
                lesson_id,
                Some(tutor_id),
                LifecycleEvent::ApproveReschedule,
                Some(proposed),
            )
            .await?
        } else {
            apply_transition(
                &mut tx,
                lesson_id,
                Some(tutor_id),
                LifecycleEvent::DeclineReschedule,
                None,
            )
            .await?
        };
        if rows == 0 {
            return Err(AppError::NotFound(REQUEST_NOT_ACTIONABLE.to_string()));
        }

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(%lesson_id, %request_id, approve, "reschedule decided");
        Ok(())
    }

    /// Tutor marks a confirmed lesson held: confirmed -> completed, and the
    /// parent's rating token is issued with a 7-day expiry.
    pub async fn complete(&self, tutor_id: Uuid, lesson_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let rows =
            apply_transition(&mut tx, lesson_id, Some(tutor_id), LifecycleEvent::Complete, None)
                .await?;
        if rows == 0 {
            return Err(AppError::NotFound(LESSON_NOT_ACTIONABLE.to_string()));
        }

        let expires_at = Utc::now() + Duration::days(7);
        let rate_token =
            TokenService::issue(&mut tx, lesson_id, TokenPurpose::Rate, expires_at).await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            %lesson_id,
            rate_link = %format!("{}/l/{}/rate/{}", self.base_url, lesson_id, rate_token),
            "lesson completed, rating link issued"
        );
        Ok(())
    }

    /// Parent rates a completed lesson via the rate token. The status stays
    /// completed; the tutor's aggregate is recomputed from the full rating
    /// set rather than maintained incrementally.
    pub async fn rate(
        &self,
        lesson_id: Uuid,
        token: &str,
        stars: i32,
        comment: Option<String>,
    ) -> Result<(), AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let redeemable = TokenService::find_redeemable(
            &mut tx,
            token,
            TokenPurpose::Rate,
            lesson_id,
            LessonStatus::Completed,
        )
        .await?
        .ok_or_else(|| AppError::Authentication(INVALID_TOKEN.to_string()))?;

        sqlx::query(
            "INSERT INTO ratings (lesson_id, tutor_id, stars, comment) VALUES ($1, $2, $3, $4)",
        )
        .bind(lesson_id)
        .bind(redeemable.tutor_id)
        .bind(stars)
        .bind(&comment)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if TokenService::mark_used(&mut tx, redeemable.token_id).await? == 0 {
            return Err(AppError::Authentication(INVALID_TOKEN.to_string()));
        }

        let (avg_stars, rating_count): (Decimal, i64) = sqlx::query_as(
            "SELECT COALESCE(AVG(stars), 0)::DECIMAL(3, 2), COUNT(id) FROM ratings WHERE tutor_id = $1",
        )
        .bind(redeemable.tutor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        sqlx::query(
            r#"
            INSERT INTO tutor_rating_summary (tutor_id, avg_stars, rating_count, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (tutor_id) DO UPDATE
                SET avg_stars = EXCLUDED.avg_stars,
                    rating_count = EXCLUDED.rating_count,
                    updated_at = NOW()
            "#,
        )
        .bind(redeemable.tutor_id)
        .bind(avg_stars)
        .bind(rating_count as i32)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(%lesson_id, stars, "rating recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_matches_the_lifecycle() {
        use LessonStatus::*;
        use LifecycleEvent::*;

        let table = [
            (Accept, Requested, Confirmed),
            (Reject, Requested, Canceled),
            (ParentCancel, Confirmed, Canceled),
            (ParentReschedule, Confirmed, RescheduleRequested),
            (ApproveReschedule, RescheduleRequested, Confirmed),
            (DeclineReschedule, RescheduleRequested, Confirmed),
            (Complete, Confirmed, Completed),
        ];

        for (event, from, to) in table {
            assert_eq!(event.from_status(), from, "{:?} source", event);
            assert_eq!(event.to_status(), to, "{:?} target", event);
        }
    }

    #[test]
    fn no_event_leaves_a_terminal_state() {
        use LifecycleEvent::*;
        for event in [
            Accept,
            Reject,
            ParentCancel,
            ParentReschedule,
            ApproveReschedule,
            DeclineReschedule,
            Complete,
        ] {
            assert_ne!(event.from_status(), LessonStatus::Canceled);
            assert_ne!(event.from_status(), LessonStatus::Completed);
        }
    }

    #[test]
    fn cancellation_well_inside_the_cutoff_is_late() {
        let now = Utc::now();
        let start = now + Duration::hours(10);
        assert!(is_late_cancellation(now, start, 24));
    }

    #[test]
    fn cancellation_well_before_the_cutoff_is_on_time() {
        let now = Utc::now();
        let start = now + Duration::hours(30);
        assert!(!is_late_cancellation(now, start, 24));
    }

    #[test]
    fn cancellation_exactly_at_the_cutoff_is_on_time() {
        // Strict less-than: exactly cutoff_hours before start is NOT late.
        let now = Utc::now();
        let start = now + Duration::hours(24);
        assert!(!is_late_cancellation(now, start, 24));
    }

    #[test]
    fn cancellation_one_minute_inside_the_cutoff_is_late() {
        let now = Utc::now();
        let start = now + Duration::hours(24) - Duration::minutes(1);
        assert!(is_late_cancellation(now, start, 24));
    }

    #[test]
    fn cancellation_after_start_is_late() {
        let now = Utc::now();
        let start = now - Duration::hours(1);
        assert!(is_late_cancellation(now, start, 24));
    }
}
