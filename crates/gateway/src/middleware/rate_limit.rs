//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use yamdb_common::errors::{AppError, Result};

/// Process-wide limiter shared by every route
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

fn non_zero(value: u32, key: &str) -> Result<NonZeroU32> {
    NonZeroU32::new(value).ok_or_else(|| AppError::Configuration {
        message: format!("rate_limit.{} must be greater than zero", key),
    })
}

/// Create a limiter refilling `requests_per_second` tokens up to `burst`
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Result<Arc<GlobalRateLimiter>> {
    let quota = Quota::per_second(non_zero(requests_per_second, "requests_per_second")?)
        .allow_burst(non_zero(burst, "burst")?);

    Ok(Arc::new(RateLimiter::direct(quota)))
}

/// Reject with 429 once the bucket is empty
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<GlobalRateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if limiter.check().is_err() {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(100, 200).unwrap();
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_burst_is_enforced() {
        let limiter = create_rate_limiter(1, 2).unwrap();
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_zero_quota_is_a_configuration_error() {
        assert!(matches!(
            create_rate_limiter(0, 10),
            Err(AppError::Configuration { .. })
        ));
        assert!(matches!(
            create_rate_limiter(10, 0),
            Err(AppError::Configuration { .. })
        ));
    }
}
