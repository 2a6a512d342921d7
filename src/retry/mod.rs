//! Retry module
//!
//! A [`RetryPolicy`] decides from the outcome of one execution whether the
//! request should be sent again. The [`RetryExecutor`] drives the loop:
//! execute, evaluate, wait for the backoff, execute again.
//!
//! The policy sees transport failures as well as responses. Whether a
//! connection error is worth another attempt is the caller's decision, not
//! the executor's.

mod executor;

pub use executor::RetryExecutor;

use reqwest::{Response, StatusCode};

/// Result of a single execution
pub type Outcome = std::result::Result<Response, reqwest::Error>;

/// Decides whether another attempt should be made
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, outcome: &Outcome) -> bool;
}

impl<F> RetryPolicy for F
where
    F: Fn(&Outcome) -> bool + Send + Sync,
{
    fn should_retry(&self, outcome: &Outcome) -> bool {
        self(outcome)
    }
}

/// Never retries
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn should_retry(&self, _outcome: &Outcome) -> bool {
        false
    }
}

/// Retries on selected status codes, and optionally on transport errors
#[derive(Debug, Clone)]
pub struct RetryOnStatus {
    statuses: Vec<StatusCode>,
    retry_transport_errors: bool,
}

impl RetryOnStatus {
    /// Retry on the given statuses only
    pub fn new(statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            retry_transport_errors: false,
        }
    }

    /// Also retry when the transport fails
    #[must_use]
    pub fn with_transport_errors(mut self, enabled: bool) -> Self {
        self.retry_transport_errors = enabled;
        self
    }

    pub fn statuses(&self) -> &[StatusCode] {
        &self.statuses
    }
}

impl Default for RetryOnStatus {
    fn default() -> Self {
        Self::new(default_retry_statuses())
    }
}

impl RetryPolicy for RetryOnStatus {
    fn should_retry(&self, outcome: &Outcome) -> bool {
        match outcome {
            Ok(response) => self.statuses.contains(&response.status()),
            Err(_) => self.retry_transport_errors,
        }
    }
}

/// Statuses that usually clear up on their own
pub fn default_retry_statuses() -> Vec<StatusCode> {
    vec![
        StatusCode::TOO_MANY_REQUESTS,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::BAD_GATEWAY,
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::GATEWAY_TIMEOUT,
    ]
}

#[cfg(test)]
mod tests;
