// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy HTTP
//!
//! An outbound HTTP request pipeline: token bucket admission control, retries
//! with pluggable backoff, request and response hooks, and authentication,
//! all governed by one cancellation context per request.
//!
//! ## Features
//!
//! - **Rate Limiting**: Token bucket refilled on a clock, or a governor quota
//! - **Retries**: Caller-supplied predicate, fresh backoff per request
//! - **Backoff Policies**: No-op, constant, limited tries, exponential with jitter
//! - **Hooks**: Ordered pre-request and post-response hooks
//! - **Authentication**: API key, Basic, Bearer, custom headers
//! - **Cancellation**: Deadlines and cancel handles reach every wait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_http::{ClientOptions, Context, HttpClient, Request, Result};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = HttpClient::new(ClientOptions {
//!         host: Some("https://api.example.com".parse()?),
//!         ..ClientOptions::default()
//!     })?;
//!
//!     let ctx = Context::background().with_timeout(Duration::from_secs(10));
//!     let response = client.send(&ctx, Request::get("/v1/users")).await?;
//!     println!("{}", response.status());
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                HttpClient::send(ctx, request)                    │
//! └──────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌───────────┬───────────┬────────┴──┬───────────┬─────────────────┐
//! │ Admission │ Pre-hooks │   Auth    │   Host    │ Retry executor  │
//! ├───────────┼───────────┼───────────┼───────────┼─────────────────┤
//! │ Token     │ Default   │ API Key   │ Path-only │ Predicate       │
//! │ bucket    │ headers   │ Basic     │ targets   │ Backoff factory │
//! │ Governor  │ Closures  │ Bearer    │           │ Transport       │
//! └───────────┴───────────┴───────────┴───────────┴─────────────────┘
//!                                  │
//!                          Post-response hooks
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Cancellation and deadlines
pub mod context;

/// Outbound request model
pub mod request;

/// Transport collaborator
pub mod transport;

/// Rate limiters
pub mod ratelimit;

/// Backoff policies
pub mod backoff;

/// Retry predicates and orchestration
pub mod retry;

/// Pre-request and post-response hooks
pub mod hooks;

/// Authentication implementations
pub mod auth;

/// Response body decoding
pub mod decode;

/// HTTP client pipeline
pub mod client;

/// Configuration loading
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

// Re-export commonly used types
pub use client::{ClientOptions, HttpClient};
pub use config::HttpConfig;
pub use context::{CancelHandle, Context, ContextError};
pub use request::Request;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
