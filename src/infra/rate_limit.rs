use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{Script, aio::ConnectionManager};
use tokio::sync::OnceCell;
use tracing::warn;
use uuid::Uuid;

use super::InfraError;
use crate::app_error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Hits inside the window, including this one when allowed.
    pub count: u64,
    /// When the oldest hit in the window falls out of it.
    pub reset_at: DateTime<Utc>,
}

/// Storage behind the limiter.
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Record one hit against `key` if it fits within `limit` per `window`.
    async fn hit(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
    ) -> Result<RateLimitDecision, InfraError>;
}

/// Sliding window over a sorted set scored by hit time in milliseconds.
///
/// ARGV: now_ms, window_ms, limit, member. Returns {allowed, count, reset_ms}.
/// Rejected hits are not added, so a client hammering the endpoint does not
/// extend its own lockout.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
local count = redis.call('ZCARD', key)
local allowed = 0
if count < limit then
    redis.call('ZADD', key, now, ARGV[4])
    count = count + 1
    allowed = 1
end
redis.call('PEXPIRE', key, window)

local reset = now + window
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
if oldest[2] then
    reset = tonumber(oldest[2]) + window
end
return {allowed, count, reset}
"#;

/// Redis-backed sliding window for production use.
///
/// Connects on first use, so an unreachable Redis at boot only means the
/// limiter fails open until it comes back.
pub struct RedisSlidingWindow {
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
    script: Script,
}

impl RedisSlidingWindow {
    /// Only parses the URL; no connection is made here.
    pub fn new(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url).map_err(InfraError::RedisConnection)?;
        Ok(Self {
            client,
            manager: OnceCell::new(),
            script: Script::new(SLIDING_WINDOW_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, InfraError> {
        self.manager
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .cloned()
            .map_err(InfraError::RedisConnection)
    }
}

#[async_trait]
impl RateLimitBackend for RedisSlidingWindow {
    async fn hit(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
    ) -> Result<RateLimitDecision, InfraError> {
        let now_ms = Utc::now().timestamp_millis();
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        let member = format!("{now_ms}:{}", Uuid::new_v4());

        let mut conn = self.connection().await?;
        let (allowed, count, reset_ms): (i64, i64, i64) = self
            .script
            .key(key)
            .arg(now_ms)
            .arg(window_ms)
            .arg(limit)
            .arg(member)
            .invoke_async(&mut conn)
            .await
            .map_err(InfraError::RateLimitBackend)?;

        Ok(RateLimitDecision {
            allowed: allowed == 1,
            count: u64::try_from(count).unwrap_or(0),
            reset_at: DateTime::<Utc>::from_timestamp_millis(reset_ms)
                .unwrap_or_else(|| Utc::now() + window),
        })
    }
}

/// Per-user limiter for plan changes and cancellations.
///
/// Fails open: when the backend errors or does not answer within `timeout`,
/// the request is allowed and a warning is logged.
pub struct RateLimiter {
    backend: Arc<dyn RateLimitBackend>,
    limit: u64,
    window: Duration,
    timeout: Duration,
}

impl RateLimiter {
    pub fn new(
        backend: Arc<dyn RateLimitBackend>,
        limit: u64,
        window: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            limit,
            window,
            timeout,
        }
    }

    pub async fn check_user(&self, user_id: Uuid) -> AppResult<()> {
        let key = format!("rate:plan_change:{user_id}");
        let outcome =
            tokio::time::timeout(self.timeout, self.backend.hit(&key, self.limit, self.window))
                .await;

        match outcome {
            Ok(Ok(decision)) if decision.allowed => Ok(()),
            Ok(Ok(decision)) => {
                warn!(
                    %user_id,
                    count = decision.count,
                    limit = self.limit,
                    reset_at = %decision.reset_at,
                    "Plan change rate limit exceeded"
                );
                Err(AppError::RateLimited {
                    reset_at: decision.reset_at,
                })
            }
            Ok(Err(err)) => {
                warn!(%user_id, error = %err, "Rate limiter unavailable, allowing request");
                Ok(())
            }
            Err(_) => {
                warn!(
                    %user_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Rate limiter timed out, allowing request"
                );
                Ok(())
            }
        }
    }
}
