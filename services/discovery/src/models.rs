use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use rizqtutor_database::LessonCategory;

/// How result cards are ordered. Unknown values fall back to rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Rating,
    PriceAsc,
    PriceDesc,
    Distance,
}

/// Query-string filters; every present filter narrows the result set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default)]
    pub available_today: bool,
}

impl DiscoverQuery {
    /// Unknown categories are dropped rather than erroring, so a stale
    /// client filter degrades to an unfiltered search.
    pub fn parsed_category(&self) -> Option<LessonCategory> {
        match self.category.as_deref() {
            Some("academic") => Some(LessonCategory::Academic),
            Some("language") => Some(LessonCategory::Language),
            Some("music") => Some(LessonCategory::Music),
            Some("fine_arts") => Some(LessonCategory::FineArts),
            _ => None,
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// One result card: enough to render the tutor and start a booking.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RankedTutor {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub bio: Option<String>,
    pub avg_stars: Decimal,
    pub rating_count: i32,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub distance_km: Option<Decimal>,
    pub subjects: serde_json::Value,
    pub available_today: bool,
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub tutors: Vec<RankedTutor>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TutorCard {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub bio: Option<String>,
    pub lesson_formats: Vec<String>,
    pub levels_supported: Vec<String>,
    pub avg_stars: Decimal,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PricedLessonType {
    pub id: Uuid,
    pub category: LessonCategory,
    pub label: String,
    pub duration_minutes: i32,
    pub price_amount: Decimal,
    pub currency: String,
}

/// Public tutor page payload: the card, the bookable price list, and the
/// districts the tutor serves.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorProfileResponse {
    pub tutor: TutorCard,
    pub lesson_types: Vec<PricedLessonType>,
    pub service_areas: Vec<rizqtutor_database::TutorServiceArea>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_parses_wire_values() {
        let q: DiscoverQuery =
            serde_json::from_str(r#"{"sort":"price_asc","availableToday":true}"#).unwrap();
        assert_eq!(q.sort, SortOrder::PriceAsc);
        assert!(q.available_today);

        let default: DiscoverQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(default.sort, SortOrder::Rating);
        assert!(!default.available_today);
    }

    #[test]
    fn unknown_category_degrades_to_none() {
        let q = DiscoverQuery {
            category: Some("alchemy".to_string()),
            ..Default::default()
        };
        assert!(q.parsed_category().is_none());

        let valid = DiscoverQuery {
            category: Some("fine_arts".to_string()),
            ..Default::default()
        };
        assert_eq!(valid.parsed_category(), Some(LessonCategory::FineArts));
    }

    #[test]
    fn coordinates_require_both_finite_halves() {
        let half = DiscoverQuery {
            lat: Some(33.89),
            ..Default::default()
        };
        assert!(half.coordinates().is_none());

        let bad = DiscoverQuery {
            lat: Some(f64::NAN),
            lng: Some(35.50),
            ..Default::default()
        };
        assert!(bad.coordinates().is_none());

        let full = DiscoverQuery {
            lat: Some(33.89),
            lng: Some(35.50),
            ..Default::default()
        };
        assert_eq!(full.coordinates(), Some((33.89, 35.50)));
    }
}
