//! Token bucket rate limiter
//!
//! The bucket starts full. A background task tops it back up to capacity on
//! every tick of its clock until the limiter is closed or dropped.
//!
//! Tokens are handed out through a semaphore: taking a token forgets one
//! permit, so concurrent acquirers race for permits without a lock. Only the
//! refill-fill step is serialised, which keeps the bucket within capacity.

use super::{bounded, effective_timeout, NoTokenAvailable, RateLimiter};
use crate::context::{Context, ContextError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// Configuration for the token bucket
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of tokens in the bucket
    pub capacity: u32,
    /// How often the bucket is topped back up
    pub refill_period: Duration,
    /// Maximum wait when the caller's context has no deadline
    pub timeout: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_period: Duration::from_secs(1),
            timeout: super::DEFAULT_TIMEOUT,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new token bucket config
    pub fn new(capacity: u32, refill_period: Duration, timeout: Duration) -> Self {
        Self {
            capacity,
            refill_period,
            timeout,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    capacity: usize,
    tokens: Semaphore,
    fill: Mutex<()>,
}

impl Bucket {
    /// Top the bucket up to capacity, returning the number of tokens added
    fn refill(&self) -> usize {
        let _guard = self.fill.lock().unwrap_or_else(PoisonError::into_inner);
        // Acquirers only remove tokens, so the count cannot grow under us
        let missing = self
            .capacity
            .saturating_sub(self.tokens.available_permits());
        if missing > 0 {
            self.tokens.add_permits(missing);
        }
        missing
    }
}

/// Token bucket refilled on a ticking clock
pub struct TokenBucketRateLimiter {
    bucket: Arc<Bucket>,
    timeout: Duration,
    shutdown_tx: Mutex<Option<broadcast::Sender<()>>>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TokenBucketRateLimiter {
    /// Create a limiter that refills every `config.refill_period`
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(config: &RateLimiterConfig) -> Self {
        let period = if config.refill_period.is_zero() {
            warn!("Token bucket refill period is zero, using 1s");
            Duration::from_secs(1)
        } else {
            config.refill_period
        };
        let clock = tokio::time::interval_at(Instant::now() + period, period);
        Self::with_clock(clock, config.capacity, config.timeout)
    }

    /// Create a limiter driven by an explicit clock
    ///
    /// A zero `timeout` is replaced by the 30s default and a zero capacity is
    /// raised to one.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn with_clock(mut clock: Interval, capacity: u32, timeout: Duration) -> Self {
        let capacity = capacity.max(1) as usize;
        let bucket = Arc::new(Bucket {
            capacity,
            tokens: Semaphore::new(capacity),
            fill: Mutex::new(()),
        });

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let refill = Arc::clone(&bucket);
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(capacity, period = ?clock.period(), "Starting token bucket refill");

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = clock.tick() => {
                        let added = refill.refill();
                        if added > 0 {
                            trace!(added, "Refilled token bucket");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Token bucket refill stopped");
                        break;
                    }
                }
            }
        });

        Self {
            bucket,
            timeout: effective_timeout(timeout),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            task_handle: Mutex::new(Some(handle)),
        }
    }

    /// Maximum number of tokens
    pub fn capacity(&self) -> usize {
        self.bucket.capacity
    }

    /// Tokens currently in the bucket
    pub fn available(&self) -> usize {
        self.bucket.tokens.available_permits()
    }

    /// Wait applied when the caller's context has no deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Take a token if one is available, without waiting
    pub fn try_acquire(&self) -> bool {
        match self.bucket.tokens.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Check if the refill task is still running
    pub fn is_running(&self) -> bool {
        self.task_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the refill task
    ///
    /// Tokens still in the bucket remain available; none are added afterwards.
    pub fn stop(&self) {
        if let Some(shutdown_tx) = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self
            .task_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucketRateLimiter {
    async fn acquire(&self, ctx: &Context) -> Result<(), NoTokenAvailable> {
        let ctx = bounded(ctx, self.timeout);

        match ctx.run(self.bucket.tokens.acquire()).await {
            Ok(Ok(permit)) => {
                permit.forget();
                Ok(())
            }
            // The semaphore is never closed
            Ok(Err(_)) => Err(NoTokenAvailable {
                source: ContextError::Cancelled,
            }),
            Err(source) => Err(NoTokenAvailable { source }),
        }
    }

    fn close(&self) {
        self.stop();
    }
}

impl Drop for TokenBucketRateLimiter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for TokenBucketRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucketRateLimiter")
            .field("capacity", &self.bucket.capacity)
            .field("available", &self.available())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
