//! Configuration loading and validation
//!
//! Providers are described in a YAML file; credentials are resolved from the
//! environment at client construction, never stored in the file.

pub mod models;

pub use models::{DispatchConfig, ProviderDescriptor, WireFamily};

use crate::utils::error::{Result, SwarmError};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Top-level configuration for the dispatch engine
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Configured provider pool, in declaration order
    pub providers: Vec<ProviderDescriptor>,
    /// Dispatcher tuning
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SwarmError::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| SwarmError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        debug!("Configuration loaded: {} providers", config.providers.len());
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Rejects an empty pool, duplicate provider names, and non-HTTP
    /// endpoints. A zero request quota is only warned about here; the
    /// provider's rate limiter treats it as always-ineligible.
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(SwarmError::config("no providers configured"));
        }

        let mut seen = HashSet::new();
        for desc in &self.providers {
            if !seen.insert(desc.name.as_str()) {
                return Err(SwarmError::config(format!(
                    "duplicate provider name '{}'",
                    desc.name
                )));
            }
            if !desc.endpoint.starts_with("http://") && !desc.endpoint.starts_with("https://") {
                return Err(SwarmError::config(format!(
                    "provider '{}' endpoint must be http(s), got '{}'",
                    desc.name, desc.endpoint
                )));
            }
            if desc.requests_per_minute == 0 {
                warn!(
                    provider = %desc.name,
                    "requests_per_minute is 0; provider will never be eligible"
                );
            }
        }

        Ok(())
    }
}

/// Resolve a provider credential from the environment.
///
/// Returns `None` for unset or blank values; callers treat that as the
/// provider being permanently unavailable rather than an error.
pub fn resolve_credential(credential_ref: &str) -> Option<String> {
    std::env::var(credential_ref)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
