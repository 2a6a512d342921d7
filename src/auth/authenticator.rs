//! Authenticator implementation
//!
//! Handles applying authentication to outbound requests.

use super::types::{AuthConfig, Location};
use crate::request::Request;
use async_trait::async_trait;

/// Authenticates a request before it is sent
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &mut Request) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> Authenticator for F
where
    F: Fn(&mut Request) -> anyhow::Result<()> + Send + Sync,
{
    async fn authenticate(&self, request: &mut Request) -> anyhow::Result<()> {
        self(request)
    }
}

/// Authenticator for credentials known up front
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    config: AuthConfig,
}

impl StaticAuth {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Get the auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Apply authentication to a request
    pub fn apply(&self, request: &mut Request) -> anyhow::Result<()> {
        match &self.config {
            AuthConfig::None => {}

            AuthConfig::ApiKey {
                location,
                header_name,
                query_param,
                prefix,
                value,
            } => {
                let val = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                match location {
                    Location::Header => {
                        let header = header_name.as_deref().unwrap_or("Authorization");
                        request.set_header(header, &val)?;
                    }
                    Location::Query => {
                        let param = query_param.as_deref().unwrap_or("api_key");
                        request.push_query(param, val);
                    }
                }
            }

            AuthConfig::Basic { username, password } => {
                request.set_basic_auth(username, password);
            }

            AuthConfig::Bearer { token } => {
                request.set_header("Authorization", &format!("Bearer {token}"))?;
            }

            AuthConfig::CustomHeaders { headers } => {
                for (key, value) in headers {
                    request.set_header(key, value)?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Authenticator for StaticAuth {
    async fn authenticate(&self, request: &mut Request) -> anyhow::Result<()> {
        self.apply(request)
    }
}
