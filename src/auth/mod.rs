//! Authentication module
//!
//! Supports: API Key, Basic, Bearer, Custom Headers
//!
//! The pipeline calls its `Authenticator` once per logical request, after
//! the pre-request hooks and before the request is sent. Retries reuse the
//! authenticated request.

mod authenticator;
mod types;

pub use authenticator::{Authenticator, StaticAuth};
pub use types::{AuthConfig, Location};
