//! Config file discovery and loading.
//!
//! Resolution order (first hit wins):
//! 1. An explicit path (`--config` / `PORTCULLIS_CONFIG`)
//! 2. `./portcullis.toml` (working directory)
//! 3. `~/.config/portcullis/config.toml` (user config dir)
//!
//! Environment overrides are applied on top of the file, then the result
//! is validated.

use std::path::{Path, PathBuf};

use crate::{ConfigError, GatewayConfig, Result};

/// Default config filename in the working directory.
const LOCAL_CONFIG_FILE: &str = "portcullis.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for config directory resolution.
const APP_NAME: &str = "portcullis";

/// A validated configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: GatewayConfig,
    pub source: PathBuf,
}

/// File formats understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Pick a format from the file extension. Anything but `.yaml`/`.yml` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Toml,
        }
    }
}

/// Discover, load, override from the environment, and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => discover_config_path()?,
    };

    let mut config = load_config_file(&path)?;
    config.apply_env_overrides()?;
    config.validate()?;

    Ok(LoadedConfig {
        config,
        source: path,
    })
}

/// Load config from a specific file path (no overrides, no validation).
pub fn load_config_file(path: &Path) -> Result<GatewayConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;

    match ConfigFormat::from_path(path) {
        ConfigFormat::Toml => GatewayConfig::from_toml(&contents),
        ConfigFormat::Yaml => GatewayConfig::from_yaml(&contents),
    }
}

/// Get the user config file path for portcullis.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME).join(USER_CONFIG_FILE))
}

fn discover_config_path() -> Result<PathBuf> {
    let mut candidates = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(user) = user_config_path() {
        candidates.push(user);
    }

    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        return Ok(found.clone());
    }

    Err(ConfigError::NotFound {
        searched: candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}
