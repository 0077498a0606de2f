//! Configuration Module
//!
//! Loads service configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::constraints::split_rules;

/// Default rule text used when `DISABLED_ALGORITHMS` is unset.
pub const DEFAULT_DISABLED_ALGORITHMS: &str = "MD2, MD5, SHA1 jdkCA & usage TLSServer, \
     RSA keySize < 1024, DSA keySize < 1024, EC keySize < 224, \
     SHA1 usage SignedJAR & denyAfter 2019-01-01";

// == Cache Config ==
/// Construction parameters for a [`CacheStore`](crate::cache::CacheStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Values may be dropped by a reclaimer at any time
    pub reclaimable: bool,
    /// Maximum number of keys, 0 = unbounded
    pub max_size: usize,
    /// Default TTL in seconds, 0 = never expires
    pub ttl_seconds: u64,
    /// Values kept per queued key, 0 = queue mode disabled
    pub max_queue_depth: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reclaimable: false,
            max_size: 1000,
            ttl_seconds: 300,
            max_queue_depth: 0,
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Parameters of the shared cache
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Background expiration sweep interval in seconds
    pub cleanup_interval: u64,
    /// Constraint rules, one per element
    pub disabled_algorithms: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `MAX_QUEUE_DEPTH` - Values per queued key, 0 disables (default: 0)
    /// - `RECLAIMABLE` - Store reclaimable values (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `DISABLED_ALGORITHMS` - Comma or newline separated constraint rules
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheConfig {
                reclaimable: env_or("RECLAIMABLE", defaults.cache.reclaimable),
                max_size: env_or("MAX_ENTRIES", defaults.cache.max_size),
                ttl_seconds: env_or("DEFAULT_TTL", defaults.cache.ttl_seconds),
                max_queue_depth: env_or("MAX_QUEUE_DEPTH", defaults.cache.max_queue_depth),
            },
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            disabled_algorithms: env::var("DISABLED_ALGORITHMS")
                .map(|text| split_rules(&text))
                .unwrap_or(defaults.disabled_algorithms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            cleanup_interval: 1,
            disabled_algorithms: split_rules(DEFAULT_DISABLED_ALGORITHMS),
        }
    }
}

/// Parses an environment variable, falling back when unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.cache.ttl_seconds, 300);
        assert_eq!(config.cache.max_queue_depth, 0);
        assert!(!config.cache.reclaimable);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 1);
        assert_eq!(config.disabled_algorithms.len(), 7);
        assert_eq!(config.disabled_algorithms[0], "MD2");
    }

    #[test]
    fn test_default_rules_build() {
        let config = Config::default();
        assert!(crate::constraints::ConstraintEngine::build(&config.disabled_algorithms).is_ok());
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("SERVER_PORT");
        env::remove_var("CLEANUP_INTERVAL");
        env::set_var("MAX_ENTRIES", "42");
        env::set_var("MAX_QUEUE_DEPTH", "not-a-number");
        env::set_var("RECLAIMABLE", "true");
        env::set_var("DISABLED_ALGORITHMS", "MD5\nRC4, DES");

        let config = Config::from_env();
        assert_eq!(config.cache.max_size, 42);
        assert_eq!(config.cache.max_queue_depth, 0);
        assert!(config.cache.reclaimable);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 1);
        assert_eq!(config.disabled_algorithms, vec!["MD5", "RC4", "DES"]);

        env::remove_var("MAX_ENTRIES");
        env::remove_var("MAX_QUEUE_DEPTH");
        env::remove_var("RECLAIMABLE");
        env::remove_var("DISABLED_ALGORITHMS");
    }
}
