//! HTTP client pipeline
//!
//! Every request passes the same stages, and each stage stops the pipeline on
//! its own failure:
//!
//! 1. rate limiter admission
//! 2. pre-request hooks, in order
//! 3. authentication
//! 4. host override for path-only targets
//! 5. execution with retries
//! 6. post-response hooks, in order
//!
//! Only stage 5 is ever repeated. Hooks and authentication run once per
//! logical request.

mod options;

pub use options::{ClientOptions, DEFAULT_MAX_RATE_LIMITER_WAIT, DEFAULT_TIMEOUT};

use crate::auth::Authenticator;
use crate::backoff::BackoffFactory;
use crate::config::HttpConfig;
use crate::context::Context;
use crate::decode::decode_json;
use crate::error::{Error, Result};
use crate::hooks::{PostResponseHook, PreRequestHook};
use crate::ratelimit::RateLimiter;
use crate::request::Request;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::transport::{default_client, Transport};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP client with rate limiting, retries, hooks and authentication
///
/// Cheap to share behind an `Arc`; requests may be sent concurrently.
pub struct HttpClient {
    host: Option<Url>,
    transport: Arc<dyn Transport>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    max_rate_limiter_wait: Duration,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
    backoff_factory: Arc<dyn BackoffFactory>,
    pre_hooks: Vec<Arc<dyn PreRequestHook>>,
    post_hooks: Vec<Arc<dyn PostResponseHook>>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl HttpClient {
    /// Create a client from options
    pub fn new(options: ClientOptions) -> Result<Self> {
        let transport: Arc<dyn Transport> = match options.transport {
            Some(transport) => transport,
            None => Arc::new(default_client(options.timeout, &options.user_agent)?),
        };

        Ok(Self {
            host: options.host,
            transport,
            rate_limiter: options.rate_limiter,
            max_rate_limiter_wait: options.max_rate_limiter_wait,
            retry_policy: options.retry_policy,
            backoff_factory: options.backoff_factory,
            pre_hooks: options.pre_hooks,
            post_hooks: options.post_hooks,
            authenticator: options.authenticator,
        })
    }

    /// Create a client from a loaded configuration
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Self::new(config.to_options()?)
    }

    /// Host used for path-only targets
    pub fn host(&self) -> Option<&Url> {
        self.host.as_ref()
    }

    /// Send a request through the pipeline
    ///
    /// When a post-response hook fails the error still carries the response;
    /// take it back with [`Error::into_response`].
    pub async fn send(&self, ctx: &Context, mut request: Request) -> Result<Response> {
        if let Some(limiter) = &self.rate_limiter {
            self.admit(ctx, limiter).await?;
        }

        for hook in &self.pre_hooks {
            hook.on_request(&mut request)
                .map_err(|e| Error::request_with("error running pre request hook", e))?;
        }

        if let Some(authenticator) = &self.authenticator {
            authenticator
                .authenticate(&mut request)
                .await
                .map_err(|e| Error::request_with("error authenticating request", e))?;
        }

        let request = request.into_reqwest(self.host.as_ref())?;
        debug!(method = %request.method(), url = %request.url(), "Sending request");

        let executor = RetryExecutor::new(
            self.transport.as_ref(),
            self.retry_policy.as_deref(),
            self.backoff_factory.make(),
        );
        let mut response = executor.execute(ctx, request).await?;

        for hook in &self.post_hooks {
            if let Err(e) = hook.on_response(&mut response) {
                warn!(status = response.status().as_u16(), "Post response hook failed: {e:#}");
                return Err(Error::ResponseHandling {
                    source: e,
                    response: Box::new(response),
                });
            }
        }

        debug!(status = response.status().as_u16(), "Request completed");
        Ok(response)
    }

    /// Send a GET request
    pub async fn get(&self, ctx: &Context, target: &str) -> Result<Response> {
        self.send(ctx, Request::get(target)).await
    }

    /// Send a POST request with a JSON body
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        target: &str,
        body: &T,
    ) -> Result<Response> {
        self.send(ctx, Request::post(target).json(body)?).await
    }

    /// Send a GET request and deserialize a successful JSON response
    ///
    /// Non-success statuses fail with `Error::Http` before decoding.
    pub async fn get_json<T: DeserializeOwned>(&self, ctx: &Context, target: &str) -> Result<T> {
        let response = self.get(ctx, target).await?.error_for_status()?;
        decode_json(response).await
    }

    /// Release the rate limiter's background refill
    pub fn close(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.close();
        }
    }

    async fn admit(&self, ctx: &Context, limiter: &Arc<dyn RateLimiter>) -> Result<()> {
        let admission = if ctx.has_deadline() {
            ctx.clone()
        } else {
            ctx.clone().with_timeout(self.max_rate_limiter_wait)
        };

        limiter
            .acquire(&admission)
            .await
            .map_err(|source| {
                warn!("Rate limiter admission failed: {source}");
                Error::RateLimit {
                    source,
                    limiter: Arc::clone(limiter),
                }
            })
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("host", &self.host.as_ref().map(Url::as_str))
            .field("rate_limiter", &self.rate_limiter)
            .field("max_rate_limiter_wait", &self.max_rate_limiter_wait)
            .field("retry_policy", &self.retry_policy.is_some())
            .field("pre_hooks", &self.pre_hooks.len())
            .field("post_hooks", &self.post_hooks.len())
            .field("authenticator", &self.authenticator.is_some())
            .finish()
    }
}
