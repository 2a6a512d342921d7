//! Error types for Solidafy HTTP
//!
//! Every pipeline stage classifies its own failure and returns immediately.
//! Callers can branch on the variant to tell "never got to send" apart from
//! "rate limiter time ran out" and "sent repeatedly and gave up".

use crate::context::ContextError;
use crate::ratelimit::{NoTokenAvailable, RateLimiter};
use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;

/// The main error type for Solidafy HTTP
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Pipeline Errors
    // ============================================================================
    #[error("Error making request: {source}")]
    RequestConstruction { source: anyhow::Error },

    #[error("Rate limit error: {source}")]
    RateLimit {
        source: NoTokenAvailable,
        limiter: Arc<dyn RateLimiter>,
    },

    #[error("Error handling response: {source}")]
    ResponseHandling {
        source: anyhow::Error,
        response: Box<reqwest::Response>,
    },

    #[error("Retries exhausted after {attempts} attempts")]
    RetryExhausted {
        attempts: u32,
        last_status: Option<StatusCode>,
    },

    #[error("Retry abandoned after {attempts} attempts: {source}")]
    RetryCancelled { attempts: u32, source: ContextError },

    #[error("Request cancelled during attempt {attempts}: {source}")]
    Cancelled { attempts: u32, source: ContextError },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a request construction error
    pub fn request(message: impl Into<String>) -> Self {
        Self::RequestConstruction {
            source: anyhow::anyhow!(message.into()),
        }
    }

    /// Create a request construction error with context around a cause
    pub fn request_with(context: &'static str, cause: anyhow::Error) -> Self {
        Self::RequestConstruction {
            source: cause.context(context),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// True when a context ended the request at any stage
    ///
    /// Explicit cancellation and deadlines count alike. A rate limit error is
    /// always a context ending during admission, so it counts too; use
    /// `is_rate_limited` to single out admission.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Error::Cancelled { .. } | Error::RetryCancelled { .. } | Error::RateLimit { .. }
        )
    }

    /// The context error behind a cancellation, whichever stage it hit
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Error::Cancelled { source, .. } | Error::RetryCancelled { source, .. } => Some(*source),
            Error::RateLimit { source, .. } => Some(source.source),
            _ => None,
        }
    }

    /// True when admission was not granted in time
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    /// True when the backoff policy ran out while retries were still wanted
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Error::RetryExhausted { .. })
    }

    /// True when at least one execution completed before the failure
    ///
    /// A cancellation that lands during the first attempt counts as never
    /// sent; one that lands during a later attempt does not.
    pub fn was_sent(&self) -> bool {
        match self {
            Error::ResponseHandling { .. }
            | Error::RetryExhausted { .. }
            | Error::RetryCancelled { .. }
            | Error::Http(_) => true,
            Error::Cancelled { attempts, .. } => *attempts > 1,
            _ => false,
        }
    }

    /// Take the response out of a post-response hook failure
    pub fn into_response(self) -> Option<reqwest::Response> {
        match self {
            Error::ResponseHandling { response, .. } => Some(*response),
            _ => None,
        }
    }
}

/// Result type alias for Solidafy HTTP
pub type Result<T> = std::result::Result<T, Error>;
