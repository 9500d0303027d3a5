//! Global request rate limiting

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultDirectRateLimiter, Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;

/// Token bucket shared by every request
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl RateLimit {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst_size).unwrap_or(rps);
        let quota = Quota::per_second(rps).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Seconds until the next request would be admitted, or `None` if admitted now
    pub fn check(&self) -> Option<u32> {
        match self.limiter.check() {
            Ok(()) => None,
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                Some(wait.as_secs_f64().ceil().max(1.0) as u32)
            }
        }
    }
}

/// Middleware rejecting requests over the configured rate with 429
pub async fn rate_limit(State(limit): State<RateLimit>, request: Request, next: Next) -> Response {
    match limit.check() {
        None => next.run(request).await,
        Some(retry_after) => {
            debug!(path = %request.uri().path(), retry_after, "Rate limit exceeded");
            AppError::RateLimited { retry_after }.into_response()
        }
    }
}
