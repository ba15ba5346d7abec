//! Cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{DEFAULT_CACHE_NAME, DEFAULT_EXPIRY_MS, ENV_CACHE_NAME, ENV_EXPIRY_MS};
use crate::error::{CacheError, Result};

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of a fetched value in milliseconds
    pub expiry_ms: u64,
    /// Name attached to log events
    pub name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiry_ms: DEFAULT_EXPIRY_MS,
            name: DEFAULT_CACHE_NAME.into(),
        }
    }
}

impl CacheConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads overrides from the environment.
    ///
    /// Missing variables fall back to defaults; an unparsable expiry is
    /// logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_EXPIRY_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.expiry_ms = ms,
                Err(e) => warn!(key = ENV_EXPIRY_MS, value = %raw, error = %e, "Ignoring invalid expiry"),
            }
        }
        if let Ok(name) = std::env::var(ENV_CACHE_NAME) {
            if !name.trim().is_empty() {
                config.name = name.trim().to_string();
            }
        }

        config
    }

    /// Sets the expiry.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry_ms = u64::try_from(expiry.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the cache name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the expiry as a [`Duration`].
    pub fn expiry(&self) -> Duration {
        Duration::from_millis(self.expiry_ms)
    }

    /// Checks the config is usable.
    pub fn validate(&self) -> Result<()> {
        if self.expiry_ms == 0 {
            return Err(CacheError::InvalidConfig("expiry_ms must be greater than zero".into()));
        }
        if self.name.trim().is_empty() {
            return Err(CacheError::InvalidConfig("name cannot be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.expiry(), Duration::from_secs(60));
        assert_eq!(config.name, "refetch");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::new()
            .with_expiry(Duration::from_millis(1500))
            .with_name("exchange-rates");
        assert_eq!(config.expiry_ms, 1500);
        assert_eq!(config.name, "exchange-rates");
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let config = CacheConfig::new().with_expiry(Duration::ZERO);
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_name_rejected() {
        let config = CacheConfig::new().with_name("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CacheConfig = serde_json::from_str(r#"{"expiry_ms": 250}"#).unwrap();
        assert_eq!(config.expiry_ms, 250);
        assert_eq!(config.name, "refetch");
    }

    #[test]
    fn test_from_env() {
        std::env::set_var(ENV_EXPIRY_MS, "1234");
        std::env::set_var(ENV_CACHE_NAME, " prices ");
        let config = CacheConfig::from_env();
        assert_eq!(config.expiry_ms, 1234);
        assert_eq!(config.name, "prices");

        std::env::set_var(ENV_EXPIRY_MS, "soon");
        let config = CacheConfig::from_env();
        assert_eq!(config.expiry_ms, DEFAULT_EXPIRY_MS);

        std::env::remove_var(ENV_EXPIRY_MS);
        std::env::remove_var(ENV_CACHE_NAME);
    }
}
