use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use rizqtutor_database::{LessonStatus, TutorAvailability};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequestPayload {
    pub tutor_id: Uuid,
    #[validate(length(min = 1, message = "Student name is required"))]
    pub student_name: String,
    pub lesson_type_id: Uuid,
    #[validate(range(min = 1))]
    pub duration: i32,
    pub requested_start_at: DateTime<Utc>,
    pub level: Option<String>,
    pub note: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequestCreated {
    pub lesson_id: Uuid,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct RequestActionPayload {
    pub action: RequestAction,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RescheduleAction {
    Approve,
    Decline,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleActionPayload {
    pub action: RescheduleAction,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelPayload {
    #[validate(length(min = 1))]
    pub token: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReschedulePayload {
    #[validate(length(min = 1))]
    pub token: String,
    pub proposed_time: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RatingPayload {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(range(min = 1, max = 5))]
    pub stars: i32,
    #[validate(length(max = 140))]
    pub comment: Option<String>,
}

/// Week grid cell state posted by the availability editor, keyed
/// "{day_of_week}-{HH:MM}".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotState {
    pub available: bool,
    #[serde(default)]
    pub logistics: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityUpdatePayload {
    pub slots: HashMap<String, SlotState>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityUpdated {
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCell {
    pub status: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct WeekSummary {
    pub confirmed: usize,
    pub pending: usize,
    pub available: usize,
}

/// Template slots merged with this week's live lessons; booked cells take
/// precedence in the UI but never mutate the template.
#[derive(Debug, Serialize)]
pub struct WeekView {
    pub slots: HashMap<String, SlotState>,
    pub sessions: HashMap<String, SessionCell>,
    pub summary: WeekSummary,
    pub template: Vec<TutorAvailability>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct WeekSessionRow {
    pub id: Uuid,
    pub status: LessonStatus,
    pub lesson_label: String,
    pub student_name: String,
    pub day_of_week: i32,
    pub start_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub notifications: Vec<rizqtutor_database::TutorNotification>,
    pub unread_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct NotificationsPatchPayload {
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_payload_bounds_are_enforced() {
        let valid = RatingPayload {
            token: "t".to_string(),
            stars: 5,
            comment: Some("great".to_string()),
        };
        assert!(valid.validate().is_ok());

        let zero_stars = RatingPayload {
            token: "t".to_string(),
            stars: 0,
            comment: None,
        };
        assert!(zero_stars.validate().is_err());

        let six_stars = RatingPayload {
            token: "t".to_string(),
            stars: 6,
            comment: None,
        };
        assert!(six_stars.validate().is_err());

        let long_comment = RatingPayload {
            token: "t".to_string(),
            stars: 3,
            comment: Some("x".repeat(141)),
        };
        assert!(long_comment.validate().is_err());
    }

    #[test]
    fn lesson_request_requires_student_name_and_duration() {
        let missing_name = LessonRequestPayload {
            tutor_id: Uuid::new_v4(),
            student_name: String::new(),
            lesson_type_id: Uuid::new_v4(),
            duration: 60,
            requested_start_at: Utc::now(),
            level: None,
            note: None,
            district: None,
        };
        assert!(missing_name.validate().is_err());

        let bad_duration = LessonRequestPayload {
            student_name: "Maya".to_string(),
            duration: 0,
            ..missing_name
        };
        assert!(bad_duration.validate().is_err());
    }

    #[test]
    fn action_payloads_parse_lowercase_wire_form() {
        let accept: RequestActionPayload = serde_json::from_str(r#"{"action":"accept"}"#).unwrap();
        assert_eq!(accept.action, RequestAction::Accept);

        let decline: RescheduleActionPayload =
            serde_json::from_str(r#"{"action":"decline"}"#).unwrap();
        assert_eq!(decline.action, RescheduleAction::Decline);

        assert!(serde_json::from_str::<RequestActionPayload>(r#"{"action":"approve"}"#).is_err());
    }
}
