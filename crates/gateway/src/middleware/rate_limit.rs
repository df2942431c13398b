//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use refdisp_common::errors::{AppError, Result};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Inbound limiter shared by all routes
#[derive(Clone)]
pub struct InboundLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
    requests_per_second: u32,
}

/// Create a new rate limiter
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Result<InboundLimiter> {
    let invalid = || AppError::Configuration {
        message: "server rate limit and burst must be greater than zero".to_string(),
    };
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).ok_or_else(invalid)?)
        .allow_burst(NonZeroU32::new(burst).ok_or_else(invalid)?);

    Ok(InboundLimiter {
        limiter: Arc::new(RateLimiter::direct(quota)),
        requests_per_second,
    })
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<InboundLimiter>,
    request: Request,
    next: Next,
) -> Result<Response> {
    match limiter.limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            Err(AppError::RateLimited {
                limit: limiter.requests_per_second,
            })
        }
    }
}
