//! Common test utilities for integration tests.
//!
//! Spins up a stub OIDC provider, an echoing upstream and a gateway wired
//! to both, all on ephemeral localhost ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{State, ws::WebSocketUpgrade},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use portcullis_config::{GatewayConfig, RouteConfig};
use portcullis_server::Gateway;
use portcullis_session::{MemorySessionStore, StoreConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const GOOD_CODE: &str = "good-code";
pub const ACCESS_TOKEN: &str = "test-access-token";
pub const ALLOWED_ORIGIN: &str = "https://app.example.com";

async fn spawn(app: Router) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, handle))
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// A minimal OIDC provider accepting [`GOOD_CODE`].
pub struct StubProvider {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl StubProvider {
    pub async fn start() -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = Arc::new(format!("http://{}", addr));

        let app = Router::new()
            .route("/.well-known/openid-configuration", get(metadata))
            .route("/token", post(token))
            .route("/userinfo", get(userinfo))
            .with_state(base_url);

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn metadata(State(base_url): State<Arc<String>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "issuer": base_url.as_str(),
        "authorization_endpoint": format!("{}/auth", base_url),
        "token_endpoint": format!("{}/token", base_url),
        "userinfo_endpoint": format!("{}/userinfo", base_url),
    }))
}

async fn token(Form(form): Form<HashMap<String, String>>) -> Response {
    if form.get("code").map(String::as_str) != Some(GOOD_CODE) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 300,
    }))
    .into_response()
}

async fn userinfo(headers: HeaderMap) -> Response {
    let expected = format!("Bearer {}", ACCESS_TOKEN);
    if headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(serde_json::json!({
        "sub": "user-123",
        "name": "Test User",
        "email": "test@example.com",
        "preferred_username": "testuser",
    }))
    .into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream
// ─────────────────────────────────────────────────────────────────────────────

/// What the echo upstream saw.
#[derive(Debug, serde::Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// An upstream that echoes every request back as JSON.
///
/// `/ws/echo` is a WebSocket echo, `/moved` answers with a redirect.
pub struct StubUpstream {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl StubUpstream {
    pub async fn start() -> Result<Self> {
        let app = Router::new()
            .route("/ws/echo", get(ws_echo))
            .route("/moved", get(moved))
            .fallback(echo);
        let (addr, handle) = spawn(app).await?;
        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();

    (
        [("x-upstream", "echo")],
        Json(serde_json::json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
        })),
    )
}

async fn moved() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/elsewhere")])
}

/// Subprotocol the stub upstream accepts when a client offers it.
pub const WS_PROTOCOL: &str = "graphql-ws";

async fn ws_echo(upgrade: WebSocketUpgrade) -> Response {
    upgrade.protocols([WS_PROTOCOL]).on_upgrade(|mut socket| async move {
        while let Some(Ok(message)) = socket.recv().await {
            if socket.send(message).await.is_err() {
                break;
            }
        }
    })
}

/// An address nothing listens on.
pub async fn dead_address() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────────────────────────────────────

/// A running gateway in front of a stub provider and upstream.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub store: Arc<MemorySessionStore>,
    pub provider: StubProvider,
    pub upstream: StubUpstream,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestGateway {
    /// Start with the default test routes:
    ///
    /// - `/api/scl` (stripped) and `/api` (unstripped) to the echo upstream
    /// - `/ws` to the echo upstream with WebSocket bridging
    /// - `/dead` to a closed port
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    /// Start, letting the caller adjust the configuration first.
    pub async fn start_with(configure: impl FnOnce(&mut GatewayConfig)) -> Result<Self> {
        let provider = StubProvider::start().await?;
        let upstream = StubUpstream::start().await?;
        let dead = dead_address().await?;

        let mut config = GatewayConfig::new();
        config.oidc.provider_url = provider.base_url();
        config.oidc.client_id = "gateway".to_string();
        config.oidc.client_secret = "gateway-secret".to_string();
        config.oidc.redirect_url = "http://localhost:8080/auth/callback".to_string();
        config.security.allowed_origins = vec![ALLOWED_ORIGIN.to_string()];
        config.proxy.routes = vec![
            RouteConfig::new("/api", upstream.base_url()),
            RouteConfig::new("/api/scl", upstream.base_url()).with_strip_path(true),
            RouteConfig::new("/ws", upstream.base_url()).with_websocket(true),
            RouteConfig::new("/dead", format!("http://{}", dead)),
        ];
        configure(&mut config);

        let store = Arc::new(MemorySessionStore::new(StoreConfig::new().with_sweep(false)));
        let gateway = Gateway::from_config(config, store.clone()).await?;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            let _ = gateway
                .serve(listener, async move { signal.cancelled().await })
                .await;
        });

        Ok(Self {
            addr,
            store,
            provider,
            upstream,
            shutdown,
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Complete a login through the callback and return the `Cookie` header value.
    pub async fn login(&self, client: &reqwest::Client) -> Result<String> {
        let response = client
            .get(self.url(&format!("/auth/callback?state=test-state&code={}", GOOD_CODE)))
            .send()
            .await?;
        anyhow::ensure!(
            response.status() == StatusCode::FOUND,
            "callback returned {}",
            response.status()
        );

        session_cookie(response.headers())
            .ok_or_else(|| anyhow::anyhow!("callback did not set a session cookie"))
    }

    /// Stop the gateway and wait for it to exit.
    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.handle.await;
    }
}

/// The `name=value` pair of the session cookie in a response, if set.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("portcullis-session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// An HTTP client that hands redirects back to the test.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
