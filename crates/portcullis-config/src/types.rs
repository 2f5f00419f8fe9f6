//! Configuration types mapping to the config file schema.
//!
//! ```toml
//! [server]            # listener and request handling
//! [oidc]              # provider and client registration
//! [session]           # cookie and expiry
//! [[proxy.routes]]    # path prefix -> upstream
//! [security]          # CORS allow-list
//! [logging]           # level, format, optional file output
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
/// Default max body size for proxied requests (10 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
/// Liveness endpoint, always served outside the session gate.
pub const HEALTH_PATH: &str = "/health";
pub const DEFAULT_CALLBACK_PATH: &str = "/auth/callback";
pub const DEFAULT_LOGOUT_PATH: &str = "/auth/logout";
pub const DEFAULT_USERINFO_PATH: &str = "/auth/userinfo";
pub const DEFAULT_COOKIE_NAME: &str = "portcullis-session";
/// Default session lifetime (1 hour).
pub const DEFAULT_SESSION_MAX_AGE: u64 = 3600;
/// Longest accepted session lifetime (one year).
pub const MAX_SESSION_MAX_AGE: u64 = 365 * 24 * 60 * 60;
/// Default interval between expired-session sweeps (5 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

fn default_scopes() -> Vec<String> {
    vec![
        "openid".to_string(),
        "profile".to_string(),
        "email".to_string(),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Every section has defaults so that a minimal file only needs the
/// provider registration and the route list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub oidc: OidcConfig,
    pub session: SessionConfig,
    pub proxy: ProxyConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Create a config with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Parse from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml_str).map_err(|e| crate::ConfigError::ParseYaml(e.to_string()))
    }

    /// The `host:port` string the listener binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Log every completed request.
    pub request_logging: bool,

    /// Largest request body forwarded upstream, in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_logging: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// OpenID Connect provider and client registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcConfig {
    /// Issuer base URL; discovery reads `/.well-known/openid-configuration` under it.
    pub provider_url: String,
    pub client_id: String,
    pub client_secret: String,

    /// Redirect URI registered with the provider (points at `callback_path`).
    pub redirect_url: String,

    /// Requested scopes. Accepts a list or a comma-separated string.
    #[serde(deserialize_with = "string_or_list")]
    pub scopes: Vec<String>,

    /// Per-call timeout for provider requests.
    pub timeout_secs: u64,

    /// Check the callback `state` against the one issued at redirect.
    pub verify_state: bool,

    pub callback_path: String,
    pub logout_path: String,
    pub userinfo_path: String,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            provider_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: String::new(),
            scopes: default_scopes(),
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            verify_state: false,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
            userinfo_path: DEFAULT_USERINFO_PATH.to_string(),
        }
    }
}

/// Session cookie and lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,

    /// Session lifetime in seconds, also the cookie `Max-Age`.
    pub max_age: u64,

    /// Seconds between sweeps of expired sessions.
    pub sweep_interval_secs: u64,

    /// Mark the session cookie `Secure`.
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age: DEFAULT_SESSION_MAX_AGE,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            secure_cookie: false,
        }
    }
}

/// Upstream routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Routes in configuration order. Match order is decided by prefix length.
    pub routes: Vec<RouteConfig>,
}

/// A single path-prefix to upstream mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub path: String,
    pub upstream_url: String,

    /// Remove the matched prefix before forwarding.
    #[serde(default)]
    pub strip_path: bool,

    /// Bridge WebSocket upgrades to the upstream.
    #[serde(default)]
    pub allow_websocket: bool,
}

impl RouteConfig {
    pub fn new(path: impl Into<String>, upstream_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            upstream_url: upstream_url.into(),
            strip_path: false,
            allow_websocket: false,
        }
    }

    pub fn with_strip_path(mut self, strip: bool) -> Self {
        self.strip_path = strip;
        self
    }

    pub fn with_websocket(mut self, allow: bool) -> Self {
        self.allow_websocket = allow;
        self
    }
}

/// Cross-origin policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Exact origins, `*.domain` wildcards, or a lone `*`.
    #[serde(deserialize_with = "string_or_list")]
    pub allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,

    /// Directory for daily-rotated JSON log files. None disables file output.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            directory: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Split a comma-separated list, trimming items and dropping empties.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::String(s) => split_list(&s),
        StringOrList::List(items) => items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
    })
}
