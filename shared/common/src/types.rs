use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    Tutor,
    StudentParent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Tutor => "TUTOR",
            UserRole::StudentParent => "STUDENT_PARENT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "TUTOR" => Some(UserRole::Tutor),
            "STUDENT_PARENT" => Some(UserRole::StudentParent),
            _ => None,
        }
    }
}

// Common response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_wire_form() {
        assert_eq!(UserRole::from_str("TUTOR"), Some(UserRole::Tutor));
        assert_eq!(
            UserRole::from_str("STUDENT_PARENT"),
            Some(UserRole::StudentParent)
        );
        assert_eq!(UserRole::from_str("admin"), None);
        assert_eq!(UserRole::Tutor.as_str(), "TUTOR");
    }
}
