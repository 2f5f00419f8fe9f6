//! CORS policy and middleware.
//!
//! Preflight requests are answered here, before the session gate runs.
//! Every other response gets the policy headers added on the way out.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use url::Url;

use crate::state::AppState;

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";
pub const MAX_AGE_SECS: &str = "86400";

/// Allowed origins, compiled from configuration.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    /// The list is exactly `["*"]`: answer `*` for everyone.
    any: bool,
    /// `*` appears alongside other entries: echo any origin.
    echo_any: bool,
    exact: Vec<String>,
    /// Host suffixes from `*.domain` entries, stored as `.domain`.
    suffixes: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allowed_origins: &[String]) -> Self {
        let mut policy = Self {
            any: allowed_origins.len() == 1 && allowed_origins[0] == "*",
            ..Self::default()
        };

        for origin in allowed_origins {
            if origin == "*" {
                policy.echo_any = true;
            } else if let Some(domain) = origin.strip_prefix("*.") {
                policy.suffixes.push(format!(".{}", domain.to_ascii_lowercase()));
            } else {
                policy.exact.push(origin.trim_end_matches('/').to_string());
            }
        }

        policy
    }

    /// The `Access-Control-Allow-Origin` value for a request origin, if any.
    pub fn allow_origin(&self, origin: Option<&str>) -> Option<HeaderValue> {
        if self.any {
            return Some(HeaderValue::from_static("*"));
        }

        let origin = origin.filter(|o| !o.is_empty())?;
        if self.is_allowed(origin) {
            HeaderValue::from_str(origin).ok()
        } else {
            None
        }
    }

    fn is_allowed(&self, origin: &str) -> bool {
        if self.echo_any || self.exact.iter().any(|allowed| allowed == origin) {
            return true;
        }
        if self.suffixes.is_empty() {
            return false;
        }

        let Some(host) = Url::parse(origin)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        else {
            return false;
        };
        self.suffixes.iter().any(|suffix| host.ends_with(suffix.as_str()))
    }

    /// Set the policy headers on a response.
    pub fn apply(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        if let Some(value) = self.allow_origin(origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECS),
        );
    }
}

/// Answer preflights and add CORS headers to every response.
pub async fn cors_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    state.cors.apply(origin.as_deref(), response.headers_mut());
    response
}
