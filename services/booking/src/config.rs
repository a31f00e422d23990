use rizqtutor_common::{DatabaseConfig, JwtConfig, RateLimitConfig, RedisConfig, ServerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub base_url: String,
    /// Booking requests allowed per tutor per window.
    pub max_requests_per_minute: u32,
    /// Rating attempts allowed per lesson per window.
    pub max_rating_attempts_per_minute: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            server: ServerConfig::from_env(8001),
            database: DatabaseConfig::from_env(),
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            max_requests_per_minute: std::env::var("MAX_REQUESTS_PER_MINUTE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            max_rating_attempts_per_minute: std::env::var("MAX_RATING_ATTEMPTS_PER_MINUTE")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
        })
    }
}
