//! Session gate middleware.
//!
//! Requests with a valid session cookie continue with an
//! [`AuthContext`](portcullis_oidc::AuthContext) in their extensions.
//! Everything else is redirected to the provider.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::state::AppState;

pub async fn auth_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match state.authenticator.authenticate(&jar).await {
        Some(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        None => {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "No valid session, redirecting to provider"
            );
            state.authenticator.login_redirect(jar).into_response()
        }
    }
}
