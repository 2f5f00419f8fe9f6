//! Session and login-state cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie holding the issued `state` while a login is in flight.
pub const STATE_COOKIE_NAME: &str = "portcullis-oidc-state";

/// How long an issued `state` stays acceptable.
const STATE_COOKIE_MINUTES: i64 = 10;

/// Create the session cookie.
pub(crate) fn session_cookie(
    name: &str,
    session_id: &str,
    max_age: std::time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age.as_secs() as i64))
        .build()
}

/// Create removal cookie for the session.
pub(crate) fn clear_session_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Create the in-flight `state` cookie.
pub(crate) fn state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::minutes(STATE_COOKIE_MINUTES))
        .build()
}

/// Create removal cookie for the `state`.
pub(crate) fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Get a non-empty cookie value.
pub(crate) fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
