//! Upstream forwarding.

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, FromRequestParts, Request, State, ws::WebSocketUpgrade},
    http::{HeaderMap, header},
    response::Response,
};
use futures::StreamExt;
use http_body_util::LengthLimitError;
use portcullis_oidc::AuthContext;

use crate::error::{Result, ServerError};
use crate::forward::{self, OutboundRequest, strip_hop_by_hop};
use crate::state::AppState;
use crate::websocket;

/// Build the HTTP client used for upstream calls. Redirects are passed back to the client.
pub fn upstream_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| ServerError::Internal(format!("Failed to build upstream client: {}", e)))
}

/// Fallback handler: route the (already authenticated) request upstream.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let route = state.routes.find(&path).ok_or_else(|| {
        tracing::warn!(path = %path, "No route found");
        ServerError::NotFound(path.clone())
    })?;

    let auth = parts.extensions.get::<AuthContext>().cloned();
    let client_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    if route.allow_websocket && websocket::is_upgrade_request(&parts.headers) {
        let upgrade = WebSocketUpgrade::from_request_parts(&mut parts, &state)
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        let outbound = forward::prepare(route, &parts, auth.as_ref(), client_addr);
        return websocket::bridge(upgrade, outbound).await;
    }

    let outbound = forward::prepare(route, &parts, auth.as_ref(), client_addr);

    let limit = state.config.server.max_body_size;
    if let Some(length) = content_length(&parts.headers)
        && length > limit as u64
    {
        return Err(ServerError::PayloadTooLarge(format!(
            "request body of {} bytes exceeds limit of {} bytes",
            length, limit
        )));
    }
    let body = read_body(body, limit).await?;

    forward(&state.http, outbound, body).await
}

/// Buffer a request body of at most `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if is_length_limit(&e) {
            ServerError::PayloadTooLarge(format!("request body exceeds limit of {} bytes", limit))
        } else {
            ServerError::BadRequest(format!("Failed to read request body: {}", e))
        }
    })
}

fn is_length_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Send the request upstream and stream the response back.
pub async fn forward(
    client: &reqwest::Client,
    outbound: OutboundRequest,
    body: Bytes,
) -> Result<Response> {
    let OutboundRequest {
        method,
        url,
        headers,
    } = outbound;
    let start = Instant::now();
    let upstream = format!(
        "{}://{}",
        url.scheme(),
        url.host_str().unwrap_or_default()
    );

    let upstream_response = client
        .request(method.clone(), url.clone())
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(method = %method, upstream = %upstream, error = %e, "Upstream request failed");
            ServerError::Proxy(e.to_string())
        })?;

    let status = upstream_response.status();
    tracing::debug!(
        method = %method,
        path = %url.path(),
        upstream = %upstream,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Upstream responded"
    );

    let mut headers = upstream_response.headers().clone();
    strip_hop_by_hop(&mut headers);

    let stream = upstream_response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
