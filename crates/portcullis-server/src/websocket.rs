//! WebSocket bridging for routes that allow it.
//!
//! The upstream connection is opened before the client upgrade is accepted,
//! so an unreachable upstream is reported as a 502 instead of a dead socket.

use axum::{
    extract::ws::{self, WebSocket, WebSocketUpgrade},
    http::{HeaderMap, header},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, client::IntoClientRequest, protocol::frame::coding::CloseCode},
};

use crate::error::{Result, ServerError};
use crate::forward::OutboundRequest;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// True when the request asks for a WebSocket upgrade.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
    let connection = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    upgrade && connection
}

/// Connect to the upstream and relay frames once the client upgrade completes.
///
/// Requested subprotocols go to the upstream; the one it selects is echoed to
/// the client.
pub async fn bridge(mut upgrade: WebSocketUpgrade, outbound: OutboundRequest) -> Result<Response> {
    let mut url = outbound.url;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| ServerError::Internal(format!("cannot use {} for {}", scheme, url)))?;

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| ServerError::Proxy(e.to_string()))?;
    for (name, value) in outbound.headers.iter() {
        // The upstream handshake carries its own key and version.
        if name == header::SEC_WEBSOCKET_PROTOCOL || !name.as_str().starts_with("sec-websocket-") {
            request.headers_mut().append(name.clone(), value.clone());
        }
    }

    let (upstream, response) = connect_async(request).await.map_err(|e| {
        tracing::warn!(upstream = %url, error = %e, "Upstream WebSocket connect failed");
        ServerError::Proxy(e.to_string())
    })?;

    let selected = selected_protocol(response.headers());
    if let Some(protocol) = selected.clone() {
        upgrade = upgrade.protocols([protocol]);
    }

    tracing::debug!(upstream = %url, protocol = ?selected, "WebSocket bridge established");
    Ok(upgrade.on_upgrade(move |socket| relay(socket, upstream)))
}

fn selected_protocol(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn relay(client: WebSocket, upstream: UpstreamSocket) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let client_to_upstream = async {
        while let Some(Ok(message)) = client_rx.next().await {
            let closing = matches!(message, ws::Message::Close(_));
            if upstream_tx.send(to_upstream(message)).await.is_err() || closing {
                break;
            }
        }
        let _ = upstream_tx.close().await;
    };

    let upstream_to_client = async {
        while let Some(Ok(message)) = upstream_rx.next().await {
            let closing = matches!(message, tungstenite::Message::Close(_));
            let Some(message) = to_client(message) else {
                continue;
            };
            if client_tx.send(message).await.is_err() || closing {
                break;
            }
        }
        let _ = client_tx.close().await;
    };

    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }
    tracing::debug!("WebSocket bridge closed");
}

fn to_upstream(message: ws::Message) -> tungstenite::Message {
    match message {
        ws::Message::Text(text) => tungstenite::Message::Text(text.as_str().to_owned().into()),
        ws::Message::Binary(data) => tungstenite::Message::Binary(data),
        ws::Message::Ping(data) => tungstenite::Message::Ping(data),
        ws::Message::Pong(data) => tungstenite::Message::Pong(data),
        ws::Message::Close(frame) => tungstenite::Message::Close(frame.map(|f| {
            tungstenite::protocol::CloseFrame {
                code: CloseCode::from(f.code),
                reason: f.reason.as_str().to_owned().into(),
            }
        })),
    }
}

fn to_client(message: tungstenite::Message) -> Option<ws::Message> {
    Some(match message {
        tungstenite::Message::Text(text) => ws::Message::Text(text.as_str().to_owned().into()),
        tungstenite::Message::Binary(data) => ws::Message::Binary(data),
        tungstenite::Message::Ping(data) => ws::Message::Ping(data),
        tungstenite::Message::Pong(data) => ws::Message::Pong(data),
        tungstenite::Message::Close(frame) => ws::Message::Close(frame.map(|f| ws::CloseFrame {
            code: f.code.into(),
            reason: f.reason.as_str().to_owned().into(),
        })),
        tungstenite::Message::Frame(_) => return None,
    })
}
