//! Common test utilities for integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use tokio::task::JoinHandle;

pub const GOOD_CODE: &str = "good-code";
pub const ACCESS_TOKEN: &str = "test-access-token";

#[derive(Default)]
struct ProviderState {
    base_url: String,
    token_requests: Mutex<Vec<HashMap<String, String>>>,
    fail_userinfo: bool,
}

/// A minimal OIDC provider running in the background.
pub struct StubProvider {
    pub addr: SocketAddr,
    state: Arc<ProviderState>,
    _handle: JoinHandle<()>,
}

impl StubProvider {
    /// Start a provider that accepts [`GOOD_CODE`].
    pub async fn start() -> Result<Self> {
        Self::start_with(false).await
    }

    /// Start a provider whose user-info endpoint always fails.
    pub async fn start_with_failing_userinfo() -> Result<Self> {
        Self::start_with(true).await
    }

    async fn start_with(fail_userinfo: bool) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(ProviderState {
            base_url: format!("http://{}", addr),
            token_requests: Mutex::new(Vec::new()),
            fail_userinfo,
        });

        let app = Router::new()
            .route("/.well-known/openid-configuration", get(metadata))
            .route("/token", post(token))
            .route("/userinfo", get(userinfo))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        self.state.base_url.clone()
    }

    /// Form bodies received by the token endpoint, oldest first.
    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.state.token_requests.lock().unwrap().clone()
    }
}

async fn metadata(State(state): State<Arc<ProviderState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "issuer": state.base_url,
        "authorization_endpoint": format!("{}/auth", state.base_url),
        "token_endpoint": format!("{}/token", state.base_url),
        "userinfo_endpoint": format!("{}/userinfo", state.base_url),
        "jwks_uri": format!("{}/certs", state.base_url),
    }))
}

async fn token(
    State(state): State<Arc<ProviderState>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let accepted = form.get("code").map(String::as_str) == Some(GOOD_CODE)
        && form.get("grant_type").map(String::as_str) == Some("authorization_code");
    state.token_requests.lock().unwrap().push(form);

    if !accepted {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "invalid_grant" })),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 300,
        })),
    )
}

async fn userinfo(State(state): State<Arc<ProviderState>>, headers: HeaderMap) -> impl IntoResponse {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {}", ACCESS_TOKEN).as_str());

    if state.fail_userinfo || !authorized {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({}))).into_response();
    }

    Json(serde_json::json!({
        "sub": "user-123",
        "name": "Test User",
        "email": "test@example.com",
        "preferred_username": "testuser",
    }))
    .into_response()
}
