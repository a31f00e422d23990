use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::{AppError, RateLimitConfig, RedisConfig, RedisService};

/// Bounds request rate per identifier per rolling window. Creation paths
/// (booking requests, rating submissions) call this before touching the
/// database.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn allow(&self, identifier: &str, max_requests: u32) -> Result<bool, AppError>;
}

/// Process-local sliding window of request timestamps per identifier.
/// Only sound for a single-instance deployment.
pub struct MemoryRateLimiter {
    window: Duration,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl MemoryRateLimiter {
    pub fn new(window_seconds: u64) -> Self {
        Self {
            window: Duration::from_secs(window_seconds),
            requests: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn allow(&self, identifier: &str, max_requests: u32) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut requests = self
            .requests
            .lock()
            .map_err(|_| AppError::Internal("rate limiter lock poisoned".to_string()))?;

        let timestamps = requests.entry(identifier.to_string()).or_default();
        timestamps.retain(|ts| now.duration_since(*ts) < self.window);

        if timestamps.len() >= max_requests as usize {
            return Ok(false);
        }

        timestamps.push(now);
        Ok(true)
    }
}

/// Shared-store counter with TTL, for horizontally scaled deployments.
pub struct RedisRateLimiter {
    redis: RedisService,
    window_seconds: u64,
}

impl RedisRateLimiter {
    pub fn new(redis: RedisService, window_seconds: u64) -> Self {
        Self {
            redis,
            window_seconds,
        }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn allow(&self, identifier: &str, max_requests: u32) -> Result<bool, AppError> {
        let key = format!("rate:{}", identifier);
        self.redis
            .check_rate_limit(&key, max_requests, self.window_seconds)
            .await
    }
}

/// Selects the limiter backend from configuration. Redis is only dialed
/// when actually selected.
pub async fn build_rate_limiter(
    config: &RateLimitConfig,
    redis_config: &RedisConfig,
) -> Result<Arc<dyn RateLimiter>, AppError> {
    match config.backend.as_str() {
        "redis" => {
            let redis = RedisService::new(redis_config).await?;
            Ok(Arc::new(RedisRateLimiter::new(redis, config.window_seconds)))
        }
        _ => Ok(Arc::new(MemoryRateLimiter::new(config.window_seconds))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_limiter_caps_requests_in_window() {
        let limiter = MemoryRateLimiter::new(60);

        assert!(limiter.allow("tutor-a", 2).await.unwrap());
        assert!(limiter.allow("tutor-a", 2).await.unwrap());
        assert!(!limiter.allow("tutor-a", 2).await.unwrap());
    }

    #[tokio::test]
    async fn memory_limiter_isolates_identifiers() {
        let limiter = MemoryRateLimiter::new(60);

        assert!(limiter.allow("tutor-a", 1).await.unwrap());
        assert!(!limiter.allow("tutor-a", 1).await.unwrap());
        assert!(limiter.allow("tutor-b", 1).await.unwrap());
    }

    #[tokio::test]
    async fn memory_limiter_expires_old_timestamps() {
        let limiter = MemoryRateLimiter::new(0);

        assert!(limiter.allow("tutor-a", 1).await.unwrap());
        // Zero-length window: the first timestamp is already stale.
        assert!(limiter.allow("tutor-a", 1).await.unwrap());
    }
}
