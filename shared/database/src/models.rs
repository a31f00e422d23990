use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle states of a lesson. `confirmed_start_at_utc` is set exactly
/// while the status is confirmed, completed or reschedule_requested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "lesson_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Requested,
    Confirmed,
    Completed,
    Canceled,
    RescheduleRequested,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Requested => "requested",
            LessonStatus::Confirmed => "confirmed",
            LessonStatus::Completed => "completed",
            LessonStatus::Canceled => "canceled",
            LessonStatus::RescheduleRequested => "reschedule_requested",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "canceled_by_actor", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CanceledByActor {
    Parent,
    Tutor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "requested_by_actor", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestedByActor {
    Parent,
    Tutor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "reschedule_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RescheduleStatus {
    Pending,
    Approved,
    Declined,
}

/// Scoping tag restricting which transition a link token may authorize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "token_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Cancel,
    Reschedule,
    Rate,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Cancel => "cancel",
            TokenPurpose::Reschedule => "reschedule",
            TokenPurpose::Rate => "rate",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "lesson_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LessonCategory {
    Academic,
    Language,
    Music,
    FineArts,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tutor {
    pub id: Uuid,
    pub phone: String,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorProfile {
    pub tutor_id: Uuid,
    pub bio: Option<String>,
    pub lesson_formats: Vec<String>,
    pub levels_supported: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonType {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub category: LessonCategory,
    pub label: String,
    pub is_group_allowed: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonPricing {
    pub id: Uuid,
    pub lesson_type_id: Uuid,
    pub duration_minutes: i32,
    pub price_amount: Decimal,
    pub currency: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub lesson_type_id: Uuid,
    pub student_name: String,
    pub level: Option<String>,
    pub note: Option<String>,
    pub duration_minutes: i32,
    pub price_amount: Decimal,
    pub status: LessonStatus,
    pub requested_start_at_utc: DateTime<Utc>,
    pub confirmed_start_at_utc: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonPayment {
    pub lesson_id: Uuid,
    pub payment_status: PaymentStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonCancellation {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub canceled_by: CanceledByActor,
    pub is_late: bool,
    pub note: Option<String>,
    pub canceled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RescheduleRequest {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub requested_by: RequestedByActor,
    pub status: RescheduleStatus,
    pub proposed_start_at_utc: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub tutor_id: Uuid,
    pub stars: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorRatingSummary {
    pub tutor_id: Uuid,
    pub avg_stars: Decimal,
    pub rating_count: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CancellationPolicy {
    pub tutor_id: Uuid,
    pub cutoff_hours: i32,
    pub late_cancel_payable: bool,
}

/// Persisted half of a link token. The raw token is transmitted once and
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LinkToken {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub token_hash: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorAvailability {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub day_of_week: i32,
    pub start_time_local: NaiveTime,
    pub end_time_local: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorNotification {
    pub id: Uuid,
    pub tutor_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub lesson_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorServiceArea {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub district_id: String,
    pub district_label: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}
