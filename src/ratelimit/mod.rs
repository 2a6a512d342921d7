//! Rate limiting module
//!
//! Admission control for outbound requests. Every limiter hands out one token
//! per request and waits for a token under the caller's context.
//!
//! # Limiters
//!
//! - **Token Bucket**: fixed capacity, topped back up on every clock tick
//! - **Quota**: smooth GCRA quota (requests per second plus burst) via governor
//!
//! When the caller's context carries no deadline, a limiter imposes its own
//! default timeout so no caller can wait forever by omission.

mod quota;
mod token_bucket;

pub use quota::{QuotaConfig, QuotaRateLimiter};
pub use token_bucket::{RateLimiterConfig, TokenBucketRateLimiter};

use crate::context::{Context, ContextError};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Wait used when neither the caller nor the constructor supplies one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// No token could be taken before the context finished
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no token available in time: {source}")]
pub struct NoTokenAvailable {
    pub source: ContextError,
}

/// Admission control shared by every request of a client
#[async_trait]
pub trait RateLimiter: Send + Sync + std::fmt::Debug {
    /// Wait for a token; on success exactly one token has been taken
    async fn acquire(&self, ctx: &Context) -> Result<(), NoTokenAvailable>;

    /// Release background resources held by the limiter
    fn close(&self) {}
}

/// Substitute `timeout` when the caller did not bound the wait
fn bounded(ctx: &Context, timeout: Duration) -> Context {
    if ctx.has_deadline() {
        ctx.clone()
    } else {
        ctx.clone().with_timeout(timeout)
    }
}

/// Replace a zero timeout with the conservative default
fn effective_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        DEFAULT_TIMEOUT
    } else {
        timeout
    }
}
