//! Application state shared across handlers.

use std::sync::Arc;

use portcullis_config::GatewayConfig;
use portcullis_oidc::Authenticator;

use crate::cors::CorsPolicy;
use crate::error::Result;
use crate::proxy::upstream_client;
use crate::routing::RouteTable;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,

    /// Session gate and login flow.
    pub authenticator: Arc<Authenticator>,

    /// Upstream routes, most specific first.
    pub routes: Arc<RouteTable>,

    pub cors: Arc<CorsPolicy>,

    /// Client for upstream requests. Never follows redirects.
    pub http: reqwest::Client,
}

impl AppState {
    /// Build the state, failing on a malformed upstream URL.
    pub fn new(config: GatewayConfig, authenticator: Authenticator) -> Result<Self> {
        let routes = RouteTable::new(&config.proxy.routes)?;
        let cors = CorsPolicy::new(&config.security.allowed_origins);

        Ok(Self {
            config: Arc::new(config),
            authenticator: Arc::new(authenticator),
            routes: Arc::new(routes),
            cors: Arc::new(cors),
            http: upstream_client()?,
        })
    }
}
