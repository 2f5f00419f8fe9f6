//! Environment variable overrides.
//!
//! Applied after the config file and before validation, so secrets can be
//! injected by the environment rather than written to disk.

use crate::types::{GatewayConfig, LogFormat, split_list};
use crate::{ConfigError, Result};

/// Prefix shared by every override variable.
pub const ENV_PREFIX: &str = "PORTCULLIS_";

impl GatewayConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// `lookup` receives the full variable name (e.g. `PORTCULLIS_PORT`).
    /// Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, suffix)).filter(|v| !v.trim().is_empty())
        };

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_number("PORT", &v)?;
        }
        if let Some(v) = get("OIDC_PROVIDER_URL") {
            self.oidc.provider_url = v;
        }
        if let Some(v) = get("OIDC_CLIENT_ID") {
            self.oidc.client_id = v;
        }
        if let Some(v) = get("OIDC_CLIENT_SECRET") {
            self.oidc.client_secret = v;
        }
        if let Some(v) = get("OIDC_REDIRECT_URL") {
            self.oidc.redirect_url = v;
        }
        if let Some(v) = get("OIDC_SCOPES") {
            self.oidc.scopes = split_list(&v);
        }
        if let Some(v) = get("SESSION_COOKIE_NAME") {
            self.session.cookie_name = v;
        }
        if let Some(v) = get("SESSION_MAX_AGE") {
            self.session.max_age = parse_number("SESSION_MAX_AGE", &v)?;
        }
        if let Some(v) = get("ALLOWED_ORIGINS") {
            self.security.allowed_origins = split_list(&v);
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("LOG_FORMAT") {
            self.logging.format = v
                .parse::<LogFormat>()
                .map_err(|message| ConfigError::InvalidOverride {
                    var: format!("{}LOG_FORMAT", ENV_PREFIX),
                    message,
                })?;
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(suffix: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidOverride {
            var: format!("{}{}", ENV_PREFIX, suffix),
            message: format!("'{}': {}", value, e),
        })
}
