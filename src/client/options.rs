//! Client options

use crate::auth::Authenticator;
use crate::backoff::{BackoffFactory, NoopBackoff};
use crate::hooks::{PostResponseHook, PreRequestHook};
use crate::ratelimit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::transport::Transport;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default bound on waiting for the rate limiter when the caller sets no deadline
pub const DEFAULT_MAX_RATE_LIMITER_WAIT: Duration = Duration::from_secs(60);

/// Default per-attempt timeout of the built-in transport
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything an [`HttpClient`](super::HttpClient) can be configured with
///
/// All collaborators default to disabled: no limiter, no retries, no hooks
/// and no authentication.
#[derive(Clone)]
pub struct ClientOptions {
    /// Scheme and host for requests whose target is only a path
    pub host: Option<Url>,
    /// Transport override; a `reqwest::Client` is built when unset
    pub transport: Option<Arc<dyn Transport>>,
    /// Admission control shared by every request of the client
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    /// Bound on admission waits when the caller's context has no deadline
    pub max_rate_limiter_wait: Duration,
    /// Retry predicate; `None` sends each request once
    pub retry_policy: Option<Arc<dyn RetryPolicy>>,
    /// Produces a fresh backoff for every request
    pub backoff_factory: Arc<dyn BackoffFactory>,
    pub pre_hooks: Vec<Arc<dyn PreRequestHook>>,
    pub post_hooks: Vec<Arc<dyn PostResponseHook>>,
    pub authenticator: Option<Arc<dyn Authenticator>>,
    /// Timeout for the built-in transport
    pub timeout: Duration,
    /// User agent for the built-in transport
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: None,
            transport: None,
            rate_limiter: None,
            max_rate_limiter_wait: DEFAULT_MAX_RATE_LIMITER_WAIT,
            retry_policy: None,
            backoff_factory: Arc::new(NoopBackoff::new),
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
            authenticator: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("host", &self.host.as_ref().map(Url::as_str))
            .field("custom_transport", &self.transport.is_some())
            .field("rate_limiter", &self.rate_limiter)
            .field("max_rate_limiter_wait", &self.max_rate_limiter_wait)
            .field("retry_policy", &self.retry_policy.is_some())
            .field("pre_hooks", &self.pre_hooks.len())
            .field("post_hooks", &self.post_hooks.len())
            .field("authenticator", &self.authenticator.is_some())
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

pub(crate) fn default_user_agent() -> String {
    format!("{}/{}", crate::NAME, crate::VERSION)
}
