//! Quota rate limiter
//!
//! Uses the governor crate for a smooth GCRA quota instead of tick refills.

use super::{bounded, effective_timeout, NoTokenAvailable, RateLimiter};
use crate::context::Context;
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the quota limiter
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    /// Maximum number of requests per second
    pub requests_per_second: u32,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
    /// Maximum wait when the caller's context has no deadline
    pub timeout: Duration,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 10,
            timeout: super::DEFAULT_TIMEOUT,
        }
    }
}

impl QuotaConfig {
    /// Create a new quota config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
            ..Self::default()
        }
    }
}

/// GCRA rate limiter
#[derive(Clone)]
pub struct QuotaRateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    timeout: Duration,
}

impl QuotaRateLimiter {
    /// Create a new quota limiter; zero rates are raised to one
    pub fn new(config: &QuotaConfig) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(Governor::direct(quota)),
            timeout: effective_timeout(config.timeout),
        }
    }

    /// Try to take a token, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

#[async_trait]
impl RateLimiter for QuotaRateLimiter {
    async fn acquire(&self, ctx: &Context) -> Result<(), NoTokenAvailable> {
        let ctx = bounded(ctx, self.timeout);
        ctx.run(self.limiter.until_ready())
            .await
            .map_err(|source| NoTokenAvailable { source })
    }
}

impl std::fmt::Debug for QuotaRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaRateLimiter")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
