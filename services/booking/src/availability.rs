use std::collections::HashMap;

use chrono::NaiveTime;
use sqlx::PgPool;
use uuid::Uuid;

use rizqtutor_common::AppError;
use rizqtutor_database::{LessonStatus, TutorAvailability};

use crate::models::{SessionCell, SlotState, WeekSessionRow, WeekSummary, WeekView};

/// Parses a grid key like "1-09:00" into (day_of_week, start, end). Slots
/// are one hour; keys that do not fit the grid yield None and are skipped,
/// matching how the editor ignores malformed cells.
pub fn parse_slot_key(key: &str) -> Option<(i32, NaiveTime, NaiveTime)> {
    let (day_str, time_str) = key.split_once('-')?;

    let day_of_week: i32 = day_str.parse().ok()?;
    if !(0..=6).contains(&day_of_week) {
        return None;
    }

    let (hour_str, minute_str) = time_str.split_once(':')?;
    if minute_str.len() != 2 {
        return None;
    }
    let hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;

    let start = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let end = NaiveTime::from_hms_opt(hour + 1, 0, 0)?;

    Some((day_of_week, start, end))
}

#[derive(Clone)]
pub struct AvailabilityService {
    db_pool: PgPool,
}

impl AvailabilityService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn weekly_template(&self, tutor_id: Uuid) -> Result<Vec<TutorAvailability>, AppError> {
        sqlx::query_as::<_, TutorAvailability>(
            r#"
            SELECT id, tutor_id, day_of_week, start_time_local, end_time_local
            FROM tutor_availability
            WHERE tutor_id = $1
            ORDER BY day_of_week, start_time_local
            "#,
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    /// Full delete-and-reinsert of the weekly template. Replacement is
    /// infrequent and the template small, so no incremental diffing.
    /// Returns how many slots were written.
    pub async fn replace_weekly_template(
        &self,
        tutor_id: Uuid,
        slots: &HashMap<String, SlotState>,
    ) -> Result<usize, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM tutor_availability WHERE tutor_id = $1")
            .bind(tutor_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let mut count = 0;
        for (key, state) in slots {
            if !state.available {
                continue;
            }
            let Some((day_of_week, start, end)) = parse_slot_key(key) else {
                continue;
            };

            sqlx::query(
                r#"
                INSERT INTO tutor_availability (tutor_id, day_of_week, start_time_local, end_time_local)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(tutor_id)
            .bind(day_of_week)
            .bind(start)
            .bind(end)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
            count += 1;
        }

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(%tutor_id, count, "weekly availability replaced");
        Ok(count)
    }

    /// The tutor's week grid: template slots plus this week's requested and
    /// confirmed lessons, keyed the same way so booked cells overlay
    /// template availability.
    pub async fn week_view(&self, tutor_id: Uuid) -> Result<WeekView, AppError> {
        let template = self.weekly_template(tutor_id).await?;

        let mut slots = HashMap::new();
        for slot in &template {
            let key = format!(
                "{}-{}",
                slot.day_of_week,
                slot.start_time_local.format("%H:%M")
            );
            slots.insert(
                key,
                SlotState {
                    available: true,
                    logistics: Some("home".to_string()),
                },
            );
        }

        let session_rows = sqlx::query_as::<_, WeekSessionRow>(
            r#"
            SELECT
                l.id,
                l.status,
                lt.label AS lesson_label,
                l.student_name,
                EXTRACT(DOW FROM l.requested_start_at_utc)::INT AS day_of_week,
                TO_CHAR(l.requested_start_at_utc, 'HH24:MI') AS start_time
            FROM lessons l
            JOIN lesson_types lt ON l.lesson_type_id = lt.id
            WHERE l.tutor_id = $1
              AND l.status IN ('confirmed', 'requested')
              AND l.requested_start_at_utc >= date_trunc('week', NOW())
              AND l.requested_start_at_utc < date_trunc('week', NOW()) + interval '7 days'
            ORDER BY l.requested_start_at_utc
            "#,
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let confirmed = session_rows
            .iter()
            .filter(|r| r.status == LessonStatus::Confirmed)
            .count();
        let pending = session_rows.len() - confirmed;

        let mut sessions = HashMap::new();
        for row in session_rows {
            let key = format!("{}-{}", row.day_of_week, row.start_time);
            let status = if row.status == LessonStatus::Confirmed {
                "confirmed"
            } else {
                "pending"
            };
            sessions.insert(
                key,
                SessionCell {
                    status: status.to_string(),
                    label: format!("{} - {}", row.lesson_label, row.student_name),
                },
            );
        }

        let summary = WeekSummary {
            confirmed,
            pending,
            available: slots.len(),
        };

        Ok(WeekView {
            slots,
            sessions,
            summary,
            template,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_keys_parse_into_hour_slots() {
        let (day, start, end) = parse_slot_key("1-09:00").unwrap();
        assert_eq!(day, 1);
        assert_eq!(start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(10, 0, 0).unwrap());

        // Single-digit hour form is accepted too
        let (day, start, _) = parse_slot_key("6-9:30").unwrap();
        assert_eq!(day, 6);
        assert_eq!(start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn out_of_range_days_are_rejected() {
        assert!(parse_slot_key("7-09:00").is_none());
        assert!(parse_slot_key("-1-09:00").is_none());
    }

    #[test]
    fn malformed_times_are_rejected() {
        assert!(parse_slot_key("1-0900").is_none());
        assert!(parse_slot_key("1-9:0").is_none());
        assert!(parse_slot_key("1-25:00").is_none());
        assert!(parse_slot_key("banana").is_none());
    }

    #[test]
    fn last_hour_of_day_cannot_form_a_slot() {
        // A 23:00 start would need a 24:00 end, which the grid cannot hold.
        assert!(parse_slot_key("1-23:00").is_none());
    }
}
