//! Longest-prefix route table.
//!
//! Built once from configuration and read-only afterwards, so lookups need
//! no synchronization.

use portcullis_config::RouteConfig;
use url::Url;

/// Route table construction failure.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid upstream URL '{url}' for route '{path}': {message}")]
    InvalidUpstream {
        path: String,
        url: String,
        message: String,
    },
}

/// A path prefix mapped to an upstream base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRoute {
    pub prefix: String,
    pub upstream: Url,
    pub strip_prefix: bool,
    pub allow_websocket: bool,
}

impl ProxyRoute {
    /// Parse one configured route.
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteError> {
        let invalid = |message: String| RouteError::InvalidUpstream {
            path: config.path.clone(),
            url: config.upstream_url.clone(),
            message,
        };

        let upstream = Url::parse(&config.upstream_url).map_err(|e| invalid(e.to_string()))?;
        if upstream.cannot_be_a_base() || upstream.host_str().is_none() {
            return Err(invalid("not an absolute URL".to_string()));
        }

        Ok(Self {
            prefix: config.path.clone(),
            upstream,
            strip_prefix: config.strip_path,
            allow_websocket: config.allow_websocket,
        })
    }

    /// Whether this route serves `path`.
    pub fn matches(&self, path: &str) -> bool {
        path_matches(path, &self.prefix)
    }

    /// The path sent upstream for a request to `path`.
    ///
    /// With stripping on, the prefix is removed and an empty remainder
    /// becomes `/`. With stripping off the path is forwarded unchanged.
    pub fn forwarded_path<'a>(&self, path: &'a str) -> &'a str {
        if !self.strip_prefix {
            return path;
        }

        let prefix = trim_slash(&self.prefix);
        match path.strip_prefix(prefix) {
            Some("") => "/",
            Some(rest) => rest,
            None => path,
        }
    }
}

/// Routes ordered most-specific first.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<ProxyRoute>,
}

impl RouteTable {
    /// Build the table, failing on the first malformed upstream URL.
    pub fn new(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let mut routes = configs
            .iter()
            .map(ProxyRoute::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        // Stable: equal lengths keep configuration order.
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Ok(Self { routes })
    }

    /// The most specific route serving `path`.
    pub fn find(&self, path: &str) -> Option<&ProxyRoute> {
        self.routes.iter().find(|route| route.matches(path))
    }

    /// Routes in match order.
    pub fn routes(&self) -> &[ProxyRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Prefix match on whole path segments. `/` matches every path.
pub fn path_matches(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }

    let prefix = trim_slash(prefix);
    if trim_slash(path) == prefix {
        return true;
    }

    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn trim_slash(s: &str) -> &str {
    s.strip_suffix('/').unwrap_or(s)
}
