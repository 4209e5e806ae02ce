use governor::{DefaultDirectRateLimiter, Quota};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ProviderError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;
// Some quote endpoints reject requests without a browser-like agent
const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; capm-dashboard/", env!("CARGO_PKG_VERSION"), ")");

struct ProviderRateLimiter {
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl reqwest_ratelimit::RateLimiter for ProviderRateLimiter {
    async fn acquire_permit(&self) {
        self.rate_limiter.until_ready().await;
    }
}

/// HTTP client with timeout, exponential-backoff retries on transient
/// failures and a per-client request rate limit.
pub fn build_http_client(requests_per_second: u32) -> Result<ClientWithMiddleware, ProviderError> {
    let reqwest_client = reqwest_middleware::reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?;

    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(500), Duration::from_millis(2000))
        .build_with_max_retries(MAX_RETRIES);

    let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let rate_limiter = ProviderRateLimiter {
        rate_limiter: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(per_second))),
    };

    Ok(ClientBuilder::new(reqwest_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(reqwest_ratelimit::all(rate_limiter))
        .build())
}
