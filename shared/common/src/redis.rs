use redis::{aio::ConnectionManager, AsyncCommands, Client};

use crate::{AppError, RedisConfig};

/// Thin wrapper over a shared multiplexed connection. Only the counter
/// primitives the rate limiter needs are exposed.
#[derive(Clone)]
pub struct RedisService {
    manager: ConnectionManager,
}

impl RedisService {
    pub async fn new(config: &RedisConfig) -> Result<Self, AppError> {
        let client = Client::open(config.connection_string()).map_err(AppError::Redis)?;

        let manager = ConnectionManager::new(client).await.map_err(AppError::Redis)?;

        // Test connection
        let mut conn = manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(AppError::Redis)?;

        tracing::info!("Redis connection established");

        Ok(Self { manager })
    }

    pub fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Counter-with-TTL rate limit check. The first increment in a window
    /// sets the expiry; the key self-destructs when the window closes.
    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: u32,
        window_seconds: u64,
    ) -> Result<bool, AppError> {
        let mut conn = self.manager.clone();
        let current: u32 = conn.incr(key, 1).await.map_err(AppError::Redis)?;

        if current == 1 {
            let _: () = conn
                .expire(key, window_seconds as i64)
                .await
                .map_err(AppError::Redis)?;
        }

        Ok(current <= limit)
    }
}
