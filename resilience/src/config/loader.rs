use crate::config::error::{ConfigError, Result};
use crate::retry::{CircuitBreakerConfig, RetryConfig};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `STRUCTGEN_RETRY__MAX_ATTEMPTS=5`
pub const ENV_PREFIX: &str = "STRUCTGEN";

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Retry loop and backoff settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Breaker settings; when present they take precedence over
    /// `retry.circuit_breaker`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

/// Configuration loader with layered merging support
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Start with defaults (from Default implementations)
    /// 2. Merge config file if provided
    /// 3. Override with environment variables (STRUCTGEN_ prefix)
    pub fn load(&self) -> Result<ResilienceConfig> {
        let mut builder = Config::builder();

        // Layer 1: Defaults (serialize defaults to JSON and load as base)
        let defaults_json = serde_json::to_string(&ResilienceConfig::default())?;
        builder = builder.add_source(File::from_str(&defaults_json, config::FileFormat::Json));

        // Layer 2: Config file (if provided)
        if let Some(ref path) = self.config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            builder = builder.add_source(File::from(path.as_ref()));
        }

        // Layer 3: Environment variables, double underscore for nesting.
        // Example: STRUCTGEN_CIRCUIT_BREAKER__ENABLED=false
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: ResilienceConfig = builder.build()?.try_deserialize()?;
        crate::config::validator::validate(&config)?;

        tracing::debug!(
            max_attempts = config.retry.max_attempts,
            initial_delay_ms = config.retry.initial_delay_ms,
            breaker = config.circuit_breaker.is_some() || config.retry.circuit_breaker.is_some(),
            "resilience config loaded"
        );
        Ok(config)
    }

    /// Locate the default config file in standard locations:
    /// 1. Current directory: ./structgen.toml
    /// 2. XDG config: ~/.config/structgen/config.toml
    /// 3. Home directory: ~/.structgen.toml
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from("./structgen.toml");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("structgen").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".structgen.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<ResilienceConfig> {
        let loader = match Self::find_config_file() {
            Some(config_path) => ConfigLoader::new().with_file(config_path),
            None => ConfigLoader::new(),
        };

        loader.load()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
