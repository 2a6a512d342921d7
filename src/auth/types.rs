//! Auth configuration types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    #[default]
    Header,
    /// Place in query parameter
    Query,
}

/// Authentication configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// API Key authentication (header or query)
    ApiKey {
        /// Where to place the API key
        #[serde(default)]
        location: Location,
        /// Header name (for header location)
        #[serde(default)]
        header_name: Option<String>,
        /// Query parameter name (for query location)
        #[serde(default)]
        query_param: Option<String>,
        /// Prefix to add before the value (e.g., "Bearer ")
        #[serde(default)]
        prefix: Option<String>,
        /// The API key value
        value: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },

    /// Custom headers
    CustomHeaders {
        /// Headers to add to each request
        headers: HashMap<String, String>,
    },
}

impl AuthConfig {
    /// Check whether any authentication is configured
    pub fn is_none(&self) -> bool {
        matches!(self, AuthConfig::None)
    }
}
