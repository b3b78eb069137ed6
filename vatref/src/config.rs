//! Configuration for a [`Vat`](crate::vat::Vat).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

const DEFAULT_NAME: &str = "vat";
const DEFAULT_TURN_LIMIT: usize = 10_000;

/// Per-vat configuration.
///
/// # Example
///
/// ```rust,ignore
/// // Defaults: name "vat", 10_000 turns per run
/// let config = VatConfig::default();
///
/// // From JSON (missing fields take their defaults)
/// let config = VatConfig::from_json(r#"{ "name": "bank" }"#)?;
///
/// // Full control via builder
/// let config = VatConfig::builder()
///     .name("bank")
///     .turn_limit(500)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VatConfig {
    /// Name used in log records.
    pub name: String,

    /// Maximum number of turns a single `run_until_idle` call executes.
    pub turn_limit: usize,
}

impl Default for VatConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            turn_limit: DEFAULT_TURN_LIMIT,
        }
    }
}

impl VatConfig {
    /// Start building a configuration.
    pub fn builder() -> VatConfigBuilder {
        VatConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: VatConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_limit == 0 {
            return Err(ConfigError::Invalid("turn_limit must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Builder for [`VatConfig`].
#[derive(Debug, Clone, Default)]
pub struct VatConfigBuilder {
    name: Option<String>,
    turn_limit: Option<usize>,
}

impl VatConfigBuilder {
    /// Set the vat name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the per-run turn limit.
    pub fn turn_limit(mut self, limit: usize) -> Self {
        self.turn_limit = Some(limit);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero turn limit.
    pub fn build(self) -> Result<VatConfig, ConfigError> {
        let defaults = VatConfig::default();
        let config = VatConfig {
            name: self.name.unwrap_or(defaults.name),
            turn_limit: self.turn_limit.unwrap_or(defaults.turn_limit),
        };
        config.validate()?;
        Ok(config)
    }
}
