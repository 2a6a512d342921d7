//! Backoff module
//!
//! A backoff policy produces the wait before each retry of one logical
//! request and decides when the retry budget is spent.
//!
//! # Policies
//!
//! - **Noop**: never retries (the default)
//! - **Infinite**: constant wait, never exhausts
//! - **Limited tries**: constant wait for a fixed number of retries
//! - **Exponential**: doubling wait with jitter, capped at a maximum
//!
//! Policies are stateful and single-use. The client asks a [`BackoffFactory`]
//! for a fresh instance per request so no state leaks between requests.

mod policies;
mod types;

pub use policies::{
    ExponentialBackoff, InfiniteBackoff, LimitedTriesBackoff, NoopBackoff, MAX_JITTER,
};
pub use types::{BackoffConfig, BackoffType};

use std::time::Duration;

/// Stateful generator of waits between retries
pub trait Backoff: Send {
    /// Wait before the next retry, or `None` once retries are exhausted
    fn next_delay(&mut self) -> Option<Duration>;
}

/// Produces a fresh backoff policy for every logical request
pub trait BackoffFactory: Send + Sync {
    /// Create a new policy instance
    fn make(&self) -> Box<dyn Backoff>;
}

impl<F, B> BackoffFactory for F
where
    F: Fn() -> B + Send + Sync,
    B: Backoff + 'static,
{
    fn make(&self) -> Box<dyn Backoff> {
        Box::new(self())
    }
}

impl Backoff for Box<dyn Backoff> {
    fn next_delay(&mut self) -> Option<Duration> {
        (**self).next_delay()
    }
}
