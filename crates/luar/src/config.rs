//! Bridge configuration
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! unsupported = "inert"
//! registry_key = "my-app/luar-tables"
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry key the operator tables are stored under unless overridden
pub const DEFAULT_REGISTRY_KEY: &str = "github.com/luar-rs/luar/operator-tables";

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("Failed to parse bridge config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid bridge config: {0}")]
    ValidationError(String),
}

/// What the forward converter does with host kinds that have no script form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Fail the conversion with `BridgeError::Unsupported`
    #[default]
    Fatal,
    /// Produce a handle without an operator table and log a warning
    Inert,
}

/// Per-state bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Policy for unsupported host kinds
    #[serde(default)]
    pub unsupported: UnsupportedPolicy,

    /// Registry slot holding the operator tables
    #[serde(default = "default_registry_key")]
    pub registry_key: String,
}

fn default_registry_key() -> String {
    DEFAULT_REGISTRY_KEY.to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            unsupported: UnsupportedPolicy::default(),
            registry_key: default_registry_key(),
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration from TOML
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "registry_key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the unsupported-kind policy
    pub fn with_unsupported(mut self, policy: UnsupportedPolicy) -> Self {
        self.unsupported = policy;
        self
    }

    /// Set the registry key
    pub fn with_registry_key(mut self, key: impl Into<String>) -> Self {
        self.registry_key = key.into();
        self
    }
}
