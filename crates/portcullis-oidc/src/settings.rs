//! Authenticator settings, derived from the gateway configuration.

use std::time::Duration;

use portcullis_config::GatewayConfig;

/// Everything the authenticator needs to know about the provider and the cookie.
#[derive(Debug, Clone)]
pub struct OidcSettings {
    pub provider_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,

    /// Per-call timeout for discovery, token exchange and user-info.
    pub timeout: Duration,

    /// Persist the issued `state` in a cookie and require it back at callback.
    pub verify_state: bool,

    pub cookie_name: String,

    /// Session lifetime, also the cookie `Max-Age`.
    pub max_age: Duration,

    pub secure_cookie: bool,
}

impl OidcSettings {
    /// Build settings from a validated gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            provider_url: config.oidc.provider_url.clone(),
            client_id: config.oidc.client_id.clone(),
            client_secret: config.oidc.client_secret.clone(),
            redirect_url: config.oidc.redirect_url.clone(),
            scopes: config.oidc.scopes.clone(),
            timeout: Duration::from_secs(config.oidc.timeout_secs),
            verify_state: config.oidc.verify_state,
            cookie_name: config.session.cookie_name.clone(),
            max_age: Duration::from_secs(config.session.max_age),
            secure_cookie: config.session.secure_cookie,
        }
    }

    /// Scopes as sent in the authorization request.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}
