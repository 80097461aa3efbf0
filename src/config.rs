//! Engine connection configuration.
//!
//! Settings come from defaults, environment variables, or the builder
//! methods, and are checked with [`EngineConfig::validate`].

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Host schemes the Docker backend can connect to.
const SUPPORTED_SCHEMES: [&str; 3] = ["unix://", "tcp://", "http://"];

/// Configuration for connecting to the container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Daemon address (`unix:///var/run/docker.sock`, `tcp://host:2375`).
    /// `None` uses the local defaults.
    pub docker_host: Option<String>,
    /// Per-request timeout enforced by the runtime client.
    pub request_timeout: Duration,
    /// Deadline the command line applies to each whole operation.
    pub operation_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            docker_host: None,
            request_timeout: Duration::from_secs(120),
            operation_timeout: Duration::from_secs(300), // image pulls can be slow
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ENGINE_DOCKER_HOST`: Daemon address (falls back to `DOCKER_HOST`)
    /// - `ENGINE_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 120)
    /// - `ENGINE_OPERATION_TIMEOUT_SECS`: Per-operation deadline (default: 300)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from variables resolved by `lookup`.
    ///
    /// `ENGINE_DOCKER_HOST` must name a supported scheme. A `DOCKER_HOST`
    /// with any other scheme (`ssh://`, `npipe://`) is left to the client's
    /// local defaults instead of failing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("ENGINE_DOCKER_HOST").filter(|v| !v.is_empty()) {
            config.docker_host = Some(val);
        } else if let Some(val) = lookup("DOCKER_HOST").filter(|v| is_supported_host(v)) {
            config.docker_host = Some(val);
        }

        if let Some(val) = lookup("ENGINE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "ENGINE_REQUEST_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("ENGINE_OPERATION_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "ENGINE_OPERATION_TIMEOUT_SECS")?;
            config.operation_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(host) = &self.docker_host {
            if !is_supported_host(host) {
                return Err(ConfigError::ValidationFailed(format!(
                    "docker_host '{}' must start with one of {}",
                    host,
                    SUPPORTED_SCHEMES.join(", ")
                )));
            }
        }

        if self.request_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.operation_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "operation_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    // Builder methods

    /// Sets the daemon address.
    pub fn with_docker_host(mut self, host: impl Into<String>) -> Self {
        self.docker_host = Some(host.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the per-operation deadline.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

fn is_supported_host(host: &str) -> bool {
    SUPPORTED_SCHEMES.iter().any(|scheme| host.starts_with(scheme))
}

/// Parse an environment variable value.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
