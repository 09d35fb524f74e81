//! Container configuration.
//!
//! Settings come from code defaults, from `FERROUS_LIFECYCLE_*` environment
//! variables, or (with the `config` feature) from a JSON document.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{LifecycleError, LifecycleResult};
use crate::internal::guard::DEFAULT_MAX_DEPTH;

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "FERROUS_LIFECYCLE";

/// Settings for a [`Container`](crate::Container) and its registry.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::ContainerConfig;
///
/// let config = ContainerConfig::default()
///     .allow_circular_references(false)
///     .exempt("pooledFactory");
///
/// assert!(!config.allow_circular_references);
/// assert_eq!(config.exempt_names, vec!["pooledFactory".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Hand out early references so setter-wired cycles resolve.
    pub allow_circular_references: bool,
    /// Nested creation limit.
    pub max_creation_depth: usize,
    /// Names exempt from the re-entrant creation check.
    pub exempt_names: Vec<String>,
    /// Create every non-lazy definition right after bootstrap.
    pub preinstantiate: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_circular_references: true,
            max_creation_depth: DEFAULT_MAX_DEPTH,
            exempt_names: Vec::new(),
            preinstantiate: true,
        }
    }
}

impl ContainerConfig {
    /// Sets whether early references are handed out.
    pub fn allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    /// Sets the nested creation limit.
    pub fn max_creation_depth(mut self, depth: usize) -> Self {
        self.max_creation_depth = depth;
        self
    }

    /// Exempts a name from the re-entrant creation check.
    pub fn exempt(mut self, name: impl Into<String>) -> Self {
        self.exempt_names.push(name.into());
        self
    }

    /// Sets whether non-lazy definitions are created eagerly.
    pub fn preinstantiate(mut self, eager: bool) -> Self {
        self.preinstantiate = eager;
        self
    }

    /// Reads overrides from `FERROUS_LIFECYCLE_*` environment variables.
    pub fn from_env() -> LifecycleResult<Self> {
        Self::from_env_prefixed(ENV_PREFIX)
    }

    /// Reads overrides from `<PREFIX>_*` environment variables.
    ///
    /// Recognized keys: `ALLOW_CIRCULAR_REFERENCES`, `MAX_CREATION_DEPTH`,
    /// `EXEMPT_NAMES` (comma separated) and `PREINSTANTIATE`. Missing keys
    /// keep their defaults.
    pub fn from_env_prefixed(prefix: &str) -> LifecycleResult<Self> {
        let mut config = Self::default();
        let var = |key: &str| env::var(format!("{}_{}", prefix.to_uppercase(), key)).ok();

        if let Some(value) = var("ALLOW_CIRCULAR_REFERENCES") {
            config.allow_circular_references = parse_bool("ALLOW_CIRCULAR_REFERENCES", &value)?;
        }
        if let Some(value) = var("MAX_CREATION_DEPTH") {
            config.max_creation_depth = value
                .trim()
                .parse()
                .map_err(|_| invalid("MAX_CREATION_DEPTH", &value))?;
        }
        if let Some(value) = var("EXEMPT_NAMES") {
            config.exempt_names = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = var("PREINSTANTIATE") {
            config.preinstantiate = parse_bool("PREINSTANTIATE", &value)?;
        }
        Ok(config)
    }

    /// Parses a JSON document; absent fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> LifecycleResult<Self> {
        serde_json::from_str(json).map_err(|e| LifecycleError::Internal(format!("invalid container configuration: {e}")))
    }
}

fn parse_bool(key: &str, value: &str) -> LifecycleResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> LifecycleError {
    LifecycleError::Internal(format!("invalid value '{value}' for configuration key {key}"))
}
