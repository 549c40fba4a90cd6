//! Configuration management for Throttle.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, ThrottleError};
use crate::ratelimit::{
    EvictionPolicy, LimitConfig, DEFAULT_EVICTION_INTERVAL, DEFAULT_LIMIT,
    DEFAULT_RETENTION_FACTOR, DEFAULT_WINDOW_MS,
};

/// Prefix for environment variable overrides, e.g. `THROTTLE__RATE_LIMITING__LIMIT`.
const ENV_PREFIX: &str = "THROTTLE";

/// Main configuration for the Throttle service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Max admitted requests per window
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Cadence of the background eviction sweep in milliseconds
    #[serde(default = "default_eviction_interval_ms")]
    pub eviction_interval_ms: u64,

    /// Multiple of `window_ms` after which an idle bucket is evicted
    #[serde(default = "default_retention_factor")]
    pub retention_factor: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_ms: default_window_ms(),
            eviction_interval_ms: default_eviction_interval_ms(),
            retention_factor: default_retention_factor(),
        }
    }
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

fn default_window_ms() -> u64 {
    DEFAULT_WINDOW_MS
}

fn default_eviction_interval_ms() -> u64 {
    DEFAULT_EVICTION_INTERVAL.as_millis() as u64
}

fn default_retention_factor() -> u64 {
    DEFAULT_RETENTION_FACTOR
}

impl RateLimitingConfig {
    /// Admission limits for the rate limiter.
    pub fn limit_config(&self) -> LimitConfig {
        LimitConfig {
            limit: self.limit,
            window_ms: self.window_ms,
        }
    }

    /// Sweep cadence and retention for the evictor.
    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::new(
            Duration::from_millis(self.eviction_interval_ms),
            self.window_ms,
            self.retention_factor,
        )
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ThrottleConfig {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// The result is not validated, so callers can layer further overrides
    /// before calling [`validate`](Self::validate).
    ///
    /// The file format is inferred from its extension. Environment variables
    /// use the `THROTTLE__` prefix with `__` between sections.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: ThrottleConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load configuration from a YAML file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: ThrottleConfig =
            serde_yaml::from_str(contents).map_err(|e| ThrottleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the limiter or evictor cannot run with.
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limiting;

        if rl.limit == 0 {
            return Err(ThrottleError::Config("limit must be greater than zero".to_string()));
        }
        if rl.window_ms == 0 {
            return Err(ThrottleError::Config(
                "window_ms must be greater than zero".to_string(),
            ));
        }
        if rl.eviction_interval_ms == 0 {
            return Err(ThrottleError::Config(
                "eviction_interval_ms must be greater than zero".to_string(),
            ));
        }
        if rl.retention_factor == 0 {
            return Err(ThrottleError::Config(
                "retention_factor must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ThrottleConfig::default();

        assert_eq!(config.server.http_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.rate_limiting.limit, 2);
        assert_eq!(config.rate_limiting.window_ms, 5_000);
        assert_eq!(config.rate_limiting.eviction_interval_ms, 300_000);
        assert_eq!(config.rate_limiting.retention_factor, 2);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_derived_settings() {
        let config = RateLimitingConfig {
            limit: 10,
            window_ms: 1_000,
            eviction_interval_ms: 500,
            retention_factor: 3,
        };

        assert_eq!(
            config.limit_config(),
            LimitConfig {
                limit: 10,
                window_ms: 1_000
            }
        );

        let policy = config.eviction_policy();
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.retention_ms, 3_000);
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
server:
  http_addr: "0.0.0.0:9000"
rate_limiting:
  limit: 100
logging:
  format: json
"#;

        let config = ThrottleConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.server.http_addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.rate_limiting.limit, 100);
        assert_eq!(config.rate_limiting.window_ms, 5_000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_from_yaml_rejects_zero_limit() {
        let yaml = "rate_limiting:\n  limit: 0\n";

        let result = ThrottleConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ThrottleError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = ThrottleConfig::default();
        config.rate_limiting.window_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ThrottleConfig::default();
        config.rate_limiting.eviction_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ThrottleConfig::default();
        config.rate_limiting.retention_factor = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = ThrottleConfig::from_file("/nonexistent/throttle.yaml");
        assert!(matches!(result, Err(ThrottleError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("throttle-config-{}.yaml", std::process::id()));
        std::fs::write(&path, "rate_limiting:\n  limit: 7\n  window_ms: 2000\n").unwrap();

        let config = ThrottleConfig::load(Some(path.to_str().unwrap())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.rate_limiting.limit, 7);
        assert_eq!(config.rate_limiting.window_ms, 2_000);
        assert_eq!(config.rate_limiting.retention_factor, 2);
    }

    #[test]
    fn test_load_defers_validation_to_overrides() {
        let path = std::env::temp_dir().join(format!("throttle-zero-{}.yaml", std::process::id()));
        std::fs::write(&path, "rate_limiting:\n  limit: 0\n").unwrap();

        let mut config = ThrottleConfig::load(Some(path.to_str().unwrap())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.rate_limiting.limit, 0);
        assert!(config.validate().is_err());

        config.rate_limiting.limit = 5;
        assert!(config.validate().is_ok());
    }
}
