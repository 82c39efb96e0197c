//! Cache capacity configuration
//!
//! Capacities can be set programmatically or overridden from environment
//! variables.

use serde::{Deserialize, Serialize};

/// Default number of page tiles kept across both generations
pub const DEFAULT_CAPACITY: usize = 120;

/// Default number of whole-page thumbnails kept
pub const DEFAULT_THUMBNAIL_CAPACITY: usize = 8;

/// Configuration for the tile cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum page tiles across the active and passive generations
    pub capacity: usize,
    /// Maximum thumbnails
    pub thumbnail_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            thumbnail_capacity: DEFAULT_THUMBNAIL_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn new(capacity: usize, thumbnail_capacity: usize) -> Self {
        Self {
            capacity,
            thumbnail_capacity,
        }
    }

    /// Sets the page tile capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the thumbnail capacity.
    pub fn with_thumbnail_capacity(mut self, thumbnail_capacity: usize) -> Self {
        self.thumbnail_capacity = thumbnail_capacity;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PAGEVIEW_CACHE_CAPACITY`: page tile capacity (default: 120)
    /// - `PAGEVIEW_THUMBNAIL_CAPACITY`: thumbnail capacity (default: 8)
    ///
    /// # Errors
    /// Returns an error if any variable is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Applies environment overrides on top of this configuration.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(capacity) = read_capacity("PAGEVIEW_CACHE_CAPACITY")? {
            self.capacity = capacity;
        }
        if let Some(capacity) = read_capacity("PAGEVIEW_THUMBNAIL_CAPACITY")? {
            self.thumbnail_capacity = capacity;
        }
        Ok(self)
    }
}

fn read_capacity(key: &str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => match value.trim().parse::<usize>() {
            Ok(capacity) if capacity > 0 => Ok(Some(capacity)),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        },
        Err(_) => Ok(None),
    }
}

/// Errors that can occur while reading cache configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for configuration key: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 120);
        assert_eq!(config.thumbnail_capacity, 8);
    }

    #[test]
    fn test_builder_methods() {
        let config = CacheConfig::default()
            .with_capacity(32)
            .with_thumbnail_capacity(4);
        assert_eq!(config, CacheConfig::new(32, 4));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(&["PAGEVIEW_CACHE_CAPACITY", "PAGEVIEW_THUMBNAIL_CAPACITY"]);

        env::set_var("PAGEVIEW_CACHE_CAPACITY", "64");
        env::set_var("PAGEVIEW_THUMBNAIL_CAPACITY", "2");

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.thumbnail_capacity, 2);
    }

    #[test]
    #[serial]
    fn test_from_env_partial() {
        let _guard = EnvGuard::new(&["PAGEVIEW_CACHE_CAPACITY", "PAGEVIEW_THUMBNAIL_CAPACITY"]);

        env::remove_var("PAGEVIEW_THUMBNAIL_CAPACITY");
        env::set_var("PAGEVIEW_CACHE_CAPACITY", "200");

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.capacity, 200);
        assert_eq!(config.thumbnail_capacity, DEFAULT_THUMBNAIL_CAPACITY);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let _guard = EnvGuard::new(&["PAGEVIEW_CACHE_CAPACITY", "PAGEVIEW_THUMBNAIL_CAPACITY"]);

        env::remove_var("PAGEVIEW_THUMBNAIL_CAPACITY");
        env::set_var("PAGEVIEW_CACHE_CAPACITY", "lots");
        assert!(CacheConfig::from_env().is_err());

        env::set_var("PAGEVIEW_CACHE_CAPACITY", "0");
        assert!(CacheConfig::from_env().is_err());
    }

    // Saves and restores environment variables around a test
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }
}
