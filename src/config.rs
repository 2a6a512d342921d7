//! Client configuration loaded from YAML or JSON
//!
//! A config file describes one client: where it sends requests, how fast,
//! what it retries and how it authenticates. [`HttpConfig::to_options`] turns
//! it into [`ClientOptions`].

use crate::auth::{AuthConfig, Authenticator, StaticAuth};
use crate::backoff::BackoffConfig;
use crate::client::ClientOptions;
use crate::error::{Error, Result};
use crate::hooks::DefaultHeaders;
use crate::ratelimit::{
    QuotaConfig, QuotaRateLimiter, RateLimiter, RateLimiterConfig, TokenBucketRateLimiter,
};
use crate::retry::{default_retry_statuses, RetryOnStatus, RetryPolicy};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Scheme and host for path-only request targets
    #[serde(default)]
    pub host: Option<String>,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Bound on waiting for the rate limiter when the caller sets no deadline
    #[serde(default = "default_max_rate_limiter_wait_ms")]
    pub max_rate_limiter_wait_ms: u64,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Headers added to every request that does not set them itself
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Rate limiting
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// Retry behavior
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    /// Authentication
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout_seconds: default_timeout_seconds(),
            max_rate_limiter_wait_ms: default_max_rate_limiter_wait_ms(),
            user_agent: None,
            headers: HashMap::new(),
            rate_limit: None,
            retry: None,
            auth: AuthConfig::None,
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_rate_limiter_wait_ms() -> u64 {
    60000
}

// ============================================================================
// Rate Limit Config
// ============================================================================

/// Which limiter implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimiterKind {
    /// Bucket refilled to capacity on every period
    #[default]
    TokenBucket,
    /// Smooth GCRA quota
    Governor,
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Limiter implementation
    #[serde(default)]
    pub kind: RateLimiterKind,

    /// Bucket capacity (token bucket) or burst size (governor)
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Refill period in milliseconds (token bucket)
    #[serde(default = "default_refill_period_ms")]
    pub refill_period_ms: u64,

    /// Limiter's own wait bound in milliseconds
    #[serde(default = "default_limiter_timeout_ms")]
    pub timeout_ms: u64,

    /// Sustained rate (governor)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            kind: RateLimiterKind::TokenBucket,
            capacity: default_capacity(),
            refill_period_ms: default_refill_period_ms(),
            timeout_ms: default_limiter_timeout_ms(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

fn default_capacity() -> u32 {
    10
}

fn default_refill_period_ms() -> u64 {
    1000
}

fn default_limiter_timeout_ms() -> u64 {
    30000
}

fn default_requests_per_second() -> u32 {
    10
}

impl RateLimitConfig {
    /// Build the limiter
    ///
    /// A token bucket starts its refill task here, so this must run inside a
    /// Tokio runtime.
    pub fn build(&self) -> Result<Arc<dyn RateLimiter>> {
        self.validate()?;
        let timeout = Duration::from_millis(self.timeout_ms);
        let limiter: Arc<dyn RateLimiter> = match self.kind {
            RateLimiterKind::TokenBucket => {
                Arc::new(TokenBucketRateLimiter::new(&RateLimiterConfig::new(
                    self.capacity,
                    Duration::from_millis(self.refill_period_ms),
                    timeout,
                )))
            }
            RateLimiterKind::Governor => Arc::new(QuotaRateLimiter::new(&QuotaConfig {
                requests_per_second: self.requests_per_second,
                burst_size: self.capacity,
                timeout,
            })),
        };
        Ok(limiter)
    }

    fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(invalid("rate_limit.capacity", "must be greater than 0"));
        }
        match self.kind {
            RateLimiterKind::TokenBucket if self.refill_period_ms == 0 => Err(invalid(
                "rate_limit.refill_period_ms",
                "must be greater than 0",
            )),
            RateLimiterKind::Governor if self.requests_per_second == 0 => Err(invalid(
                "rate_limit.requests_per_second",
                "must be greater than 0",
            )),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Retry Config
// ============================================================================

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Status codes that trigger a retry
    #[serde(default = "default_statuses")]
    pub statuses: Vec<u16>,

    /// Retry when the transport itself fails
    #[serde(default)]
    pub retry_transport_errors: bool,

    /// Waits between attempts
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            statuses: default_statuses(),
            retry_transport_errors: false,
            backoff: BackoffConfig::default(),
        }
    }
}

fn default_statuses() -> Vec<u16> {
    default_retry_statuses()
        .into_iter()
        .map(|status| status.as_u16())
        .collect()
}

impl RetryConfig {
    /// Build the retry predicate
    pub fn policy(&self) -> Result<RetryOnStatus> {
        let statuses = self
            .statuses
            .iter()
            .map(|&code| {
                StatusCode::from_u16(code)
                    .map_err(|e| invalid("retry.statuses", &format!("{code}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RetryOnStatus::new(statuses).with_transport_errors(self.retry_transport_errors))
    }
}

// ============================================================================
// Loading
// ============================================================================

impl HttpConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file; `.json` files are read as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parsed host override
    pub fn host_url(&self) -> Result<Option<Url>> {
        self.host.as_deref().map(Url::parse).transpose().map_err(Error::from)
    }

    /// Default headers as a header map
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| invalid("headers", &format!("{name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| invalid("headers", &format!("{name}: {e}")))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    /// Turn the config into client options
    ///
    /// Builds the rate limiter, so it must run inside a Tokio runtime when a
    /// token bucket is configured.
    pub fn to_options(&self) -> Result<ClientOptions> {
        let mut options = ClientOptions {
            host: self.host_url()?,
            timeout: Duration::from_secs(self.timeout_seconds),
            max_rate_limiter_wait: Duration::from_millis(self.max_rate_limiter_wait_ms),
            ..ClientOptions::default()
        };

        if let Some(user_agent) = &self.user_agent {
            options.user_agent = user_agent.clone();
        }

        let headers = self.header_map()?;
        if !headers.is_empty() {
            options.pre_hooks.push(Arc::new(DefaultHeaders::new(headers)));
        }

        if let Some(retry) = &self.retry {
            let policy: Arc<dyn RetryPolicy> = Arc::new(retry.policy()?);
            options.retry_policy = Some(policy);
            options.backoff_factory = retry.backoff.factory()?;
        }

        if !self.auth.is_none() {
            let authenticator: Arc<dyn Authenticator> =
                Arc::new(StaticAuth::new(self.auth.clone()));
            options.authenticator = Some(authenticator);
        }

        // Last, so a bad field above never leaves a refill task behind
        if let Some(rate_limit) = &self.rate_limit {
            options.rate_limiter = Some(rate_limit.build()?);
        }

        Ok(options)
    }
}

fn invalid(field: &str, message: &str) -> Error {
    Error::InvalidConfigValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}
