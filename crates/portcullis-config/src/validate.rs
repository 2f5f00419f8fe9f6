//! Startup validation of a loaded configuration.

use url::Url;

use crate::types::{GatewayConfig, HEALTH_PATH, MAX_SESSION_MAX_AGE, OidcConfig};
use crate::{ConfigError, Result};

impl GatewayConfig {
    /// Check the configuration, returning the first problem found.
    ///
    /// A config that passes can be handed to the gateway without further
    /// checks: required OIDC settings are present, URLs are absolute http(s),
    /// and the route list contains a `/` catch-all.
    pub fn validate(&self) -> Result<()> {
        let oidc = &self.oidc;
        require("oidc.provider_url", &oidc.provider_url)?;
        require("oidc.client_id", &oidc.client_id)?;
        require("oidc.client_secret", &oidc.client_secret)?;
        require("oidc.redirect_url", &oidc.redirect_url)?;
        http_url("oidc.provider_url", &oidc.provider_url)?;
        http_url("oidc.redirect_url", &oidc.redirect_url)?;

        if oidc.timeout_secs == 0 {
            return Err(ConfigError::invalid("oidc.timeout_secs", "must be at least 1"));
        }
        oidc.validate_endpoints()?;

        require("session.cookie_name", &self.session.cookie_name)?;
        if self.session.max_age == 0 {
            return Err(ConfigError::invalid("session.max_age", "must be at least 1 second"));
        }
        if self.session.max_age > MAX_SESSION_MAX_AGE {
            return Err(ConfigError::invalid(
                "session.max_age",
                format!("must be at most {} seconds", MAX_SESSION_MAX_AGE),
            ));
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "session.sweep_interval_secs",
                "must be at least 1 second",
            ));
        }

        if self.proxy.routes.is_empty() {
            return Err(ConfigError::MissingField("proxy.routes".to_string()));
        }
        for (i, route) in self.proxy.routes.iter().enumerate() {
            absolute_path(&format!("proxy.routes[{}].path", i), &route.path)?;
            http_url(&format!("proxy.routes[{}].upstream_url", i), &route.upstream_url)?;
        }
        if !self.proxy.routes.iter().any(|r| r.path == "/") {
            return Err(ConfigError::invalid(
                "proxy.routes",
                "a catch-all route with path \"/\" is required",
            ));
        }

        Ok(())
    }
}

impl OidcConfig {
    /// Check that the callback, logout and userinfo paths can be mounted
    /// together: each is a literal absolute path, distinct from the others
    /// and from the health check.
    pub fn validate_endpoints(&self) -> Result<()> {
        let endpoints = [
            ("oidc.callback_path", &self.callback_path),
            ("oidc.logout_path", &self.logout_path),
            ("oidc.userinfo_path", &self.userinfo_path),
        ];
        for (i, (field, path)) in endpoints.iter().enumerate() {
            endpoint_path(field, path)?;
            if path.as_str() == HEALTH_PATH {
                return Err(ConfigError::invalid(
                    *field,
                    format!("'{}' is reserved for the health check", path),
                ));
            }
            if let Some((other, _)) = endpoints[..i].iter().find(|(_, p)| p == path) {
                return Err(ConfigError::invalid(
                    *field,
                    format!("'{}' is already used by {}", path, other),
                ));
            }
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField(field.to_string()));
    }
    Ok(())
}

fn absolute_path(field: &str, value: &str) -> Result<()> {
    if !value.starts_with('/') {
        return Err(ConfigError::invalid(field, format!("'{}' must start with '/'", value)));
    }
    Ok(())
}

/// An absolute path the router can register as a literal route.
fn endpoint_path(field: &str, value: &str) -> Result<()> {
    absolute_path(field, value)?;

    if value.contains(['{', '}']) {
        return Err(ConfigError::invalid(
            field,
            format!("'{}' must not contain '{{' or '}}'", value),
        ));
    }
    if value
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(ConfigError::invalid(
            field,
            format!("'{}' has a segment starting with ':' or '*'", value),
        ));
    }
    Ok(())
}

fn http_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::invalid(field, format!("'{}': {}", value, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::invalid(
            field,
            format!("'{}' must be an absolute http(s) URL", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RouteConfig;

    fn valid_config() -> GatewayConfig {
        let mut config = GatewayConfig::new();
        config.oidc.provider_url = "http://provider.com".to_string();
        config.oidc.client_id = "client-id".to_string();
        config.oidc.client_secret = "client-secret".to_string();
        config.oidc.redirect_url = "http://localhost:8080/auth/callback".to_string();
        config.proxy.routes = vec![
            RouteConfig::new("/api", "http://api:8080").with_strip_path(true),
            RouteConfig::new("/", "http://backend"),
        ];
        config
    }

    #[test]
    fn test_valid_config_passes() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn test_missing_oidc_fields() {
        let config = GatewayConfig::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "oidc.provider_url"));

        let mut config = valid_config();
        config.oidc.client_secret.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "oidc.client_secret"));
    }

    #[test]
    fn test_zero_max_age_rejected() {
        let mut config = valid_config();
        config.session.max_age = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "session.max_age"
        ));
    }

    #[test]
    fn test_routes_required() {
        let mut config = valid_config();
        config.proxy.routes.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField(ref f)) if f == "proxy.routes"
        ));
    }

    #[test]
    fn test_catch_all_required() {
        let mut config = valid_config();
        config.proxy.routes = vec![RouteConfig::new("/api", "http://api:8080")];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("catch-all"));
    }

    #[test]
    fn test_bad_upstream_url() {
        let mut config = valid_config();
        config.proxy.routes.push(RouteConfig::new("/files", "not a url"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("proxy.routes[2].upstream_url"));

        let mut config = valid_config();
        config.proxy.routes[0].upstream_url = "ftp://files.example.com".to_string();
        assert!(config.validate().is_err());
    }

    fn invalid_field(config: &GatewayConfig) -> Option<String> {
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_max_age_upper_bound() {
        let mut config = valid_config();
        config.session.max_age = MAX_SESSION_MAX_AGE;
        config.validate().unwrap();

        config.session.max_age = 10_000_000_000_000;
        assert_eq!(invalid_field(&config).as_deref(), Some("session.max_age"));
    }

    #[test]
    fn test_endpoint_cannot_shadow_health() {
        let mut config = valid_config();
        config.oidc.userinfo_path = "/health".to_string();
        assert_eq!(invalid_field(&config).as_deref(), Some("oidc.userinfo_path"));
    }

    #[test]
    fn test_endpoints_must_be_distinct() {
        let mut config = valid_config();
        config.oidc.logout_path = config.oidc.callback_path.clone();
        assert_eq!(invalid_field(&config).as_deref(), Some("oidc.logout_path"));

        let mut config = valid_config();
        config.oidc.userinfo_path = config.oidc.logout_path.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("oidc.logout_path"));
    }

    #[test]
    fn test_endpoint_must_be_literal() {
        for path in ["/auth/{id}", "/auth/}", "/auth/:user", "/auth/*rest"] {
            let mut config = valid_config();
            config.oidc.callback_path = path.to_string();
            assert_eq!(
                invalid_field(&config).as_deref(),
                Some("oidc.callback_path"),
                "{} accepted",
                path
            );
        }

        let mut config = valid_config();
        config.oidc.callback_path = "auth/callback".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_route_path_must_be_absolute() {
        let mut config = valid_config();
        config.proxy.routes[0].path = "api".to_string();
        assert!(config.validate().is_err());
    }
}
