//! Backoff configuration types

use super::{
    Backoff, BackoffFactory, ExponentialBackoff, InfiniteBackoff, LimitedTriesBackoff,
    NoopBackoff,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Never retry
    #[default]
    None,
    /// Constant delay, unlimited retries
    Constant,
    /// Constant delay, limited retries
    LimitedTries,
    /// Exponential increase in delay with jitter
    Exponential,
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Base delay in milliseconds
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,

    /// Maximum delay in milliseconds (exponential only)
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Maximum number of retries (limited tries and exponential)
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::None,
            base_ms: default_base_ms(),
            max_ms: default_max_ms(),
            retries: default_retries(),
        }
    }
}

fn default_base_ms() -> u64 {
    250
}

fn default_max_ms() -> u64 {
    60000
}

fn default_retries() -> u32 {
    5
}

impl BackoffConfig {
    /// Create a config of the given type with default timings
    pub fn new(backoff_type: BackoffType) -> Self {
        Self {
            backoff_type,
            ..Self::default()
        }
    }

    /// Check the config can produce a policy
    pub fn validate(&self) -> Result<()> {
        if self.backoff_type == BackoffType::Exponential && self.base_ms == 0 {
            return Err(Error::InvalidConfigValue {
                field: "backoff.base_ms".to_string(),
                message: "exponential backoff needs a base greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Build a fresh policy instance
    ///
    /// # Panics
    ///
    /// Panics for an exponential config with a zero base; call `validate` or
    /// `factory` first.
    pub fn build(&self) -> Box<dyn Backoff> {
        let base = Duration::from_millis(self.base_ms);
        match self.backoff_type {
            BackoffType::None => Box::new(NoopBackoff::new()),
            BackoffType::Constant => Box::new(InfiniteBackoff::new(base)),
            BackoffType::LimitedTries => Box::new(LimitedTriesBackoff::new(base, self.retries)),
            BackoffType::Exponential => Box::new(ExponentialBackoff::new(
                base,
                Duration::from_millis(self.max_ms),
                self.retries,
            )),
        }
    }

    /// Validate and turn the config into a factory
    pub fn factory(&self) -> Result<Arc<dyn BackoffFactory>> {
        self.validate()?;
        let config = self.clone();
        Ok(Arc::new(move || config.build()))
    }
}
