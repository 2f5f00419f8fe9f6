//! Outbound request preparation.
//!
//! Turns an inbound request head into the request sent upstream without
//! touching the network, so header and URL rewriting can be tested alone.

use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, header, request::Parts};
use portcullis_oidc::AuthContext;
use url::Url;

use crate::routing::ProxyRoute;

pub const X_AUTH_USER: &str = "x-auth-user";
pub const X_AUTH_EMAIL: &str = "x-auth-email";
pub const X_AUTH_NAME: &str = "x-auth-name";
pub const X_AUTH_USERNAME: &str = "x-auth-username";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Headers meaningful only for a single connection leg.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Everything needed to issue the upstream request, minus the body.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

/// Prepare the upstream request for `route`.
pub fn prepare(
    route: &ProxyRoute,
    parts: &Parts,
    auth: Option<&AuthContext>,
    client_addr: Option<SocketAddr>,
) -> OutboundRequest {
    let path = route.forwarded_path(parts.uri.path());
    let url = target_url(&route.upstream, path, parts.uri.query());

    let mut headers = parts.headers.clone();
    let inbound_host = headers
        .remove(header::HOST)
        .or_else(|| {
            parts
                .uri
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
        });
    strip_hop_by_hop(&mut headers);
    // The body is re-framed by the HTTP client.
    headers.remove(header::CONTENT_LENGTH);

    if let Some(addr) = client_addr {
        append_forwarded_for(&mut headers, addr);
    }
    if let Some(host) = inbound_host {
        headers.insert(HeaderName::from_static(X_FORWARDED_HOST), host);
    }

    inject_identity(&mut headers, auth);

    OutboundRequest {
        method: parts.method.clone(),
        url,
        headers,
    }
}

/// Join the upstream base and request path with a single slash and merge queries.
pub fn target_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = base.clone();
    url.set_path(&join_paths(base.path(), path));

    let base_query = base.query().filter(|q| !q.is_empty());
    let query = query.filter(|q| !q.is_empty());
    let merged = match (base_query, query) {
        (Some(a), Some(b)) => Some(format!("{}&{}", a, b)),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    };
    url.set_query(merged.as_deref());
    url
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in &named {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let client_ip = addr.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.trim().is_empty() => format!("{}, {}", prior, client_ip),
        _ => client_ip,
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(HeaderName::from_static(X_FORWARDED_FOR), value);
    }
}

/// Replace any client-supplied identity headers with the authenticated ones.
fn inject_identity(headers: &mut HeaderMap, auth: Option<&AuthContext>) {
    let spoofed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with("x-auth-"))
        .cloned()
        .collect();
    for name in spoofed {
        headers.remove(&name);
    }

    let Some(auth) = auth else {
        return;
    };

    let user = &auth.user;
    let identity = [
        (X_AUTH_USER, user.subject.as_str()),
        (X_AUTH_EMAIL, user.email.as_str()),
        (X_AUTH_NAME, user.name.as_str()),
        (X_AUTH_USERNAME, user.preferred_username.as_str()),
    ];
    for (name, value) in identity {
        set_header(headers, HeaderName::from_static(name), value);
    }

    if !auth.access_token.is_empty() {
        set_header(
            headers,
            header::AUTHORIZATION,
            &format!("Bearer {}", auth.access_token),
        );
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_bytes(value.as_bytes()) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => {
            tracing::warn!(header = %name, "Identity value is not a valid header value, skipping");
        }
    }
}
