//! Outbound request throttling
//!
//! Throttles are acquired before every remote call. The token bucket uses
//! the governor crate; the fixed interval gate spaces calls by a minimum
//! delay.

use crate::config::{ThrottleConfig, ThrottleStrategy};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Pacing policy invoked before a remote call
#[async_trait]
pub trait RequestThrottle: Send + Sync {
    /// Wait until the next call is allowed
    async fn acquire(&self);
}

/// Token bucket rate limiter
pub struct TokenBucketThrottle {
    limiter: DefaultDirectRateLimiter,
}

impl TokenBucketThrottle {
    pub fn new(requests_per_second: u32, burst: u32) -> Result<Self> {
        let rate = NonZeroU32::new(requests_per_second).ok_or_else(|| AppError::Configuration {
            message: "throttle.requests_per_second must be greater than zero".to_string(),
        })?;
        let burst = NonZeroU32::new(burst).ok_or_else(|| AppError::Configuration {
            message: "throttle.burst must be greater than zero".to_string(),
        })?;

        Ok(Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
        })
    }
}

#[async_trait]
impl RequestThrottle for TokenBucketThrottle {
    async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

/// Minimum delay between consecutive acquisitions
///
/// The first acquisition never waits.
pub struct FixedIntervalThrottle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl FixedIntervalThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl RequestThrottle for FixedIntervalThrottle {
    async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// No throttling
pub struct Unthrottled;

#[async_trait]
impl RequestThrottle for Unthrottled {
    async fn acquire(&self) {}
}

/// Create a throttle based on configuration
pub fn create_throttle(config: &ThrottleConfig) -> Result<Arc<dyn RequestThrottle>> {
    let throttle: Arc<dyn RequestThrottle> = match config.strategy {
        ThrottleStrategy::TokenBucket => {
            Arc::new(TokenBucketThrottle::new(config.requests_per_second, config.burst)?)
        }
        ThrottleStrategy::FixedInterval => {
            Arc::new(FixedIntervalThrottle::new(Duration::from_millis(config.min_interval_ms)))
        }
        ThrottleStrategy::None => Arc::new(Unthrottled),
    };

    tracing::debug!(strategy = ?config.strategy, "Request throttle created");
    Ok(throttle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_rejected() {
        assert!(TokenBucketThrottle::new(0, 10).is_err());
        assert!(TokenBucketThrottle::new(10, 0).is_err());
    }

    #[tokio::test]
    async fn test_token_bucket_allows_burst() {
        let throttle = TokenBucketThrottle::new(1, 3).unwrap();
        let start = std::time::Instant::now();
        for _ in 0..3 {
            throttle.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_spacing() {
        let throttle = FixedIntervalThrottle::new(Duration::from_millis(1000));
        let start = Instant::now();

        throttle.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(1));

        throttle.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));

        throttle.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_create_from_config() {
        let config = ThrottleConfig {
            strategy: ThrottleStrategy::None,
            ..ThrottleConfig::default()
        };
        let throttle = create_throttle(&config).unwrap();
        throttle.acquire().await;

        let bad = ThrottleConfig {
            strategy: ThrottleStrategy::TokenBucket,
            requests_per_second: 0,
            ..ThrottleConfig::default()
        };
        assert!(create_throttle(&bad).is_err());
    }
}
