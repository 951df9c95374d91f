//! Layered configuration for the resilience layer
//!
//! Sources, later wins:
//! 1. Defaults (from code)
//! 2. Config file (structgen.toml)
//! 3. Environment variables (STRUCTGEN_* prefix, `__` for nesting)
//!
//! # Example
//!
//! ```no_run
//! use structgen_resilience::ResilientClient;
//! use structgen_resilience::config::ConfigLoader;
//!
//! let config = ConfigLoader::load_default().expect("Failed to load config");
//! let client = ResilientClient::from_config(&config);
//! ```
pub mod error;
pub mod loader;
pub mod validator;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, ResilienceConfig};
pub use validator::validate;
