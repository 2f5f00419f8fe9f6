//! Authenticating reverse proxy for Portcullis.
//!
//! Every request outside the gateway's own endpoints must carry a valid
//! session cookie. Authenticated requests are matched against the route
//! table by longest path prefix and forwarded upstream with the caller's
//! identity attached as `X-Auth-*` headers and a bearer token.
//!
//! # Endpoints
//!
//! - `GET /health`, always public
//! - the login callback, logout and user-info paths from `[oidc]`
//! - everything else: session gate, then the proxy
//!
//! # Example
//!
//! ```ignore
//! use portcullis_server::Gateway;
//!
//! let gateway = Gateway::from_config(config, store).await?;
//! gateway.run(shutdown_signal()).await?;
//! ```

pub mod cors;
pub mod error;
pub mod forward;
pub mod gate;
pub mod logging;
pub mod proxy;
pub mod routes;
pub mod routing;
pub mod state;
pub mod websocket;

pub use cors::CorsPolicy;
pub use error::{ErrorResponse, Result, ServerError};
pub use routing::{ProxyRoute, RouteError, RouteTable};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, middleware, routing::get};
use portcullis_config::GatewayConfig;
use portcullis_oidc::{Authenticator, OidcSettings};
use portcullis_session::SharedSessionStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The gateway HTTP server.
pub struct Gateway {
    state: AppState,
}

impl Gateway {
    /// Create a gateway from configuration and a ready authenticator.
    pub fn new(config: GatewayConfig, authenticator: Authenticator) -> Result<Self> {
        // The login endpoints become literal routes; axum panics on clashes.
        config.oidc.validate_endpoints()?;
        Ok(Self {
            state: AppState::new(config, authenticator)?,
        })
    }

    /// Discover the provider, then build the gateway.
    pub async fn from_config(config: GatewayConfig, store: SharedSessionStore) -> Result<Self> {
        let settings = OidcSettings::from_config(&config);
        let authenticator = Authenticator::discover(settings, store).await?;
        Self::new(config, authenticator)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let oidc = &self.state.config.oidc;

        Router::new()
            .merge(routes::health_routes())
            // Login flow endpoints sit outside the session gate
            .route(&oidc.callback_path, get(routes::callback_handler))
            .route(&oidc.logout_path, get(routes::logout_handler))
            .route(&oidc.userinfo_path, get(routes::userinfo_handler))
            .merge(self.proxy_routes())
            // CORS (inner layer, answers preflights before the gate)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                cors::cors_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            // TraceLayer for detailed HTTP tracing
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Everything not matched above: session gate, then the upstream proxy.
    fn proxy_routes(&self) -> Router<AppState> {
        Router::new()
            .fallback(proxy::proxy_handler)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                gate::auth_gate,
            ))
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        if let Ok(addr) = listener.local_addr() {
            info!("Gateway listening on {}", addr);
        }
        for route in self.state.routes.routes() {
            info!(
                path = %route.prefix,
                upstream = %route.upstream,
                strip_path = route.strip_prefix,
                websocket = route.allow_websocket,
                "Route registered"
            );
        }

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Bind the configured listen address and serve.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config.listen_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        self.serve(listener, shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Utc;
    use portcullis_config::RouteConfig;
    use portcullis_oidc::ProviderMetadata;
    use portcullis_session::{MemorySessionStore, SessionRecord, SessionStore, StoreConfig, UserInfo};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> GatewayConfig {
        let mut config = GatewayConfig::new();
        config.oidc.provider_url = "http://provider.invalid".to_string();
        config.oidc.client_id = "gateway".to_string();
        config.oidc.client_secret = "secret".to_string();
        config.oidc.redirect_url = "http://localhost:8080/auth/callback".to_string();
        config.security.allowed_origins = vec!["https://app.example.com".to_string()];
        config.proxy.routes = vec![RouteConfig::new("/api", "http://127.0.0.1:9")];
        config
    }

    fn test_gateway() -> (Gateway, Arc<MemorySessionStore>) {
        let config = test_config();
        let store = Arc::new(MemorySessionStore::new(StoreConfig::new().with_sweep(false)));
        let metadata = ProviderMetadata {
            issuer: "http://provider.invalid".to_string(),
            authorization_endpoint: "http://provider.invalid/auth".to_string(),
            token_endpoint: "http://provider.invalid/token".to_string(),
            userinfo_endpoint: "http://provider.invalid/userinfo".to_string(),
            jwks_uri: None,
        };
        let authenticator = Authenticator::with_metadata(
            OidcSettings::from_config(&config),
            metadata,
            store.clone(),
        )
        .unwrap();
        (Gateway::new(config, authenticator).unwrap(), store)
    }

    #[test]
    fn test_endpoint_clashing_with_health_is_rejected() {
        let mut config = test_config();
        config.oidc.userinfo_path = "/health".to_string();
        let store = Arc::new(MemorySessionStore::new(StoreConfig::new().with_sweep(false)));
        let metadata = ProviderMetadata {
            issuer: "http://provider.invalid".to_string(),
            authorization_endpoint: "http://provider.invalid/auth".to_string(),
            token_endpoint: "http://provider.invalid/token".to_string(),
            userinfo_endpoint: "http://provider.invalid/userinfo".to_string(),
            jwks_uri: None,
        };
        let authenticator =
            Authenticator::with_metadata(OidcSettings::from_config(&config), metadata, store)
                .unwrap();

        let err = Gateway::new(config, authenticator).err().unwrap();
        assert!(matches!(err, ServerError::Config(_)));
        assert!(err.to_string().contains("oidc.userinfo_path"));
    }

    async fn store_session(store: &MemorySessionStore, id: &str) {
        let record = SessionRecord {
            session_id: id.to_string(),
            user_info: UserInfo {
                subject: "user-1".to_string(),
                name: "Test User".to_string(),
                email: "test@example.com".to_string(),
                preferred_username: "testuser".to_string(),
            },
            access_token: "token-1".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            state: String::new(),
        };
        store.put(id, record).await;
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (gateway, _) = test_gateway();

        let response = gateway
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unauthenticated_request_redirects_to_provider() {
        let (gateway, _) = test_gateway();

        let response = gateway
            .router()
            .oneshot(Request::builder().uri("/api/things").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("http://provider.invalid/auth?"));
        assert!(location.contains("client_id=gateway"));
    }

    #[tokio::test]
    async fn test_preflight_answered_before_gate() {
        let (gateway, _) = test_gateway();

        let response = gateway
            .router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/things")
                    .header(header::ORIGIN, "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn test_userinfo_without_session_is_unauthorized() {
        let (gateway, _) = test_gateway();

        let response = gateway
            .router()
            .oneshot(Request::builder().uri("/auth/userinfo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_userinfo_with_session() {
        let (gateway, store) = test_gateway();
        store_session(&store, "abc").await;

        let response = gateway
            .router()
            .oneshot(
                Request::builder()
                    .uri("/auth/userinfo")
                    .header(header::COOKIE, "portcullis-session=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let user: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(user["sub"], "user-1");
        assert_eq!(user["email"], "test@example.com");
    }

    #[tokio::test]
    async fn test_authenticated_unmatched_path_is_not_found() {
        let (gateway, store) = test_gateway();
        store_session(&store, "abc").await;

        let response = gateway
            .router()
            .oneshot(
                Request::builder()
                    .uri("/elsewhere")
                    .header(header::COOKIE, "portcullis-session=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_callback_without_state_is_bad_request() {
        let (gateway, _) = test_gateway();

        let response = gateway
            .router()
            .oneshot(
                Request::builder()
                    .uri("/auth/callback?code=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
