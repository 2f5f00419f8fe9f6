//! Login callback, logout and user-info endpoints.
//!
//! These sit outside the session gate: the callback and logout must work
//! without a session, and user-info answers 401 instead of redirecting.

use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::cookie::CookieJar;
use portcullis_oidc::{AuthRedirect, CallbackParams};
use portcullis_session::UserInfo;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Provider callback: exchange the code, issue the session cookie, redirect.
pub async fn callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<AuthRedirect> {
    Ok(state.authenticator.complete_login(jar, params).await?)
}

/// Delete the session, clear the cookie and redirect to `/`.
pub async fn logout_handler(State(state): State<AppState>, jar: CookieJar) -> AuthRedirect {
    state.authenticator.logout(jar).await
}

/// Identity claims of the current session.
pub async fn userinfo_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<UserInfo>> {
    state
        .authenticator
        .authenticate(&jar)
        .await
        .map(|ctx| Json(ctx.user))
        .ok_or_else(|| ServerError::Unauthorized("No valid session".to_string()))
}
