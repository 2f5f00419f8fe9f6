//! Configuration system for the Portcullis gateway.
//!
//! Provides file-based configuration with:
//! - TOML or YAML files, picked by extension
//! - `PORTCULLIS_*` environment overrides for secrets and deployment knobs
//! - Defaults for everything except the provider registration and routes
//! - Fail-fast validation so the gateway never starts half-configured

pub mod discovery;
pub mod env;
pub mod error;
pub mod types;
mod validate;

pub use discovery::{ConfigFormat, LoadedConfig, load_config, load_config_file, user_config_path};
pub use env::ENV_PREFIX;
pub use error::{ConfigError, Result};
pub use types::*;
