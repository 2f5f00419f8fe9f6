//! Login state machine: gate check, redirect, callback and logout.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use portcullis_session::{
    SessionRecord, SessionStore, SharedSessionStore, UserInfo, generate_session_id,
};
use serde::Deserialize;

use crate::client::{OidcClient, generate_state, states_match};
use crate::cookies::{
    STATE_COOKIE_NAME, clear_session_cookie, clear_state_cookie, cookie_value, session_cookie,
    state_cookie,
};
use crate::discovery::{self, ProviderMetadata};
use crate::error::{OidcError, Result};
use crate::settings::OidcSettings;

/// Identity attached to an authenticated request.
///
/// Lives in the request extensions for that one request and is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user: UserInfo,
    pub access_token: String,
}

/// Query parameters of the provider callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    /// Where to send the client after login. Used verbatim.
    pub redirect_uri: Option<String>,
}

/// A `302 Found` carrying cookie changes.
#[derive(Debug)]
pub struct AuthRedirect {
    location: String,
    jar: CookieJar,
}

impl AuthRedirect {
    fn new(location: impl Into<String>, jar: CookieJar) -> Self {
        Self {
            location: location.into(),
            jar,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        let location = HeaderValue::try_from(self.location.as_str()).unwrap_or_else(|_| {
            tracing::warn!(location = %self.location, "Redirect target is not a valid header value, using /");
            HeaderValue::from_static("/")
        });
        (StatusCode::FOUND, self.jar, [(header::LOCATION, location)]).into_response()
    }
}

/// OIDC authenticator bound to one provider and one session store.
#[derive(Debug)]
pub struct Authenticator {
    client: OidcClient,
    store: SharedSessionStore,
}

impl Authenticator {
    /// Discover the provider and build the authenticator.
    ///
    /// Fails if the provider metadata cannot be fetched; the gateway must not
    /// serve traffic without known endpoints.
    pub async fn discover(settings: OidcSettings, store: SharedSessionStore) -> Result<Self> {
        let http = OidcClient::http_client(&settings)?;
        let metadata = discovery::discover(&http, &settings.provider_url).await?;
        let client = OidcClient::new(http, settings, metadata)?;
        Ok(Self { client, store })
    }

    /// Build from metadata obtained elsewhere, skipping discovery.
    pub fn with_metadata(
        settings: OidcSettings,
        metadata: ProviderMetadata,
        store: SharedSessionStore,
    ) -> Result<Self> {
        let http = OidcClient::http_client(&settings)?;
        let client = OidcClient::new(http, settings, metadata)?;
        Ok(Self { client, store })
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        self.client.metadata()
    }

    pub fn settings(&self) -> &OidcSettings {
        self.client.settings()
    }

    pub fn store(&self) -> &SharedSessionStore {
        &self.store
    }

    /// Resolve the session cookie to an identity.
    ///
    /// A missing cookie, unknown id and expired session all yield `None`.
    pub async fn authenticate(&self, jar: &CookieJar) -> Option<AuthContext> {
        let session_id = cookie_value(jar, &self.settings().cookie_name)?;

        match self.store.get(&session_id).await {
            Some(record) => Some(AuthContext {
                user: record.user_info,
                access_token: record.access_token,
            }),
            None => {
                tracing::debug!(session = %log_id(&session_id), "Unknown or expired session");
                None
            }
        }
    }

    /// Start a login: redirect to the provider's authorization endpoint.
    pub fn login_redirect(&self, jar: CookieJar) -> AuthRedirect {
        let state = generate_state();
        let location = self.client.authorization_url(&state);

        let jar = if self.settings().verify_state {
            jar.add(state_cookie(&state, self.settings().secure_cookie))
        } else {
            jar
        };

        AuthRedirect::new(location, jar)
    }

    /// Finish a login from the provider callback and issue a session.
    pub async fn complete_login(
        &self,
        jar: CookieJar,
        params: CallbackParams,
    ) -> Result<AuthRedirect> {
        let state = params
            .state
            .filter(|s| !s.is_empty())
            .ok_or(OidcError::MissingParameter("state parameter"))?;
        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(OidcError::MissingParameter("authorization code"))?;

        let settings = self.settings();
        let mut jar = jar;
        if settings.verify_state {
            let issued = cookie_value(&jar, STATE_COOKIE_NAME);
            if !issued.is_some_and(|issued| states_match(&issued, &state)) {
                tracing::warn!("Callback state does not match the issued state");
                return Err(OidcError::StateMismatch);
            }
            jar = jar.add(clear_state_cookie());
        }

        let tokens = self.client.exchange_code(&code).await?;
        let user_info = self.client.fetch_user_info(&tokens.access_token).await?;

        let expires_at = chrono::Duration::from_std(settings.max_age)
            .ok()
            .and_then(|max_age| Utc::now().checked_add_signed(max_age))
            .ok_or_else(|| {
                OidcError::Config(format!(
                    "session max age of {}s is out of range",
                    settings.max_age.as_secs()
                ))
            })?;
        let record = SessionRecord {
            session_id: generate_session_id(),
            user_info,
            access_token: tokens.access_token,
            expires_at,
            state,
        };

        self.store.put(&record.session_id, record.clone()).await;
        tracing::info!(
            session = %record.short_id(),
            subject = %record.user_info.subject,
            expires_at = %record.expires_at,
            "Session established"
        );

        let jar = jar.add(session_cookie(
            &settings.cookie_name,
            &record.session_id,
            settings.max_age,
            settings.secure_cookie,
        ));
        let location = params
            .redirect_uri
            .filter(|uri| !uri.is_empty())
            .unwrap_or_else(|| "/".to_string());

        Ok(AuthRedirect::new(location, jar))
    }

    /// End the session (if any), clear the cookie and redirect to `/`.
    pub async fn logout(&self, jar: CookieJar) -> AuthRedirect {
        let settings = self.settings();
        if let Some(session_id) = cookie_value(&jar, &settings.cookie_name) {
            self.store.delete(&session_id).await;
            tracing::info!(session = %log_id(&session_id), "Session deleted on logout");
        }

        let jar = jar.add(clear_session_cookie(
            &settings.cookie_name,
            settings.secure_cookie,
        ));
        AuthRedirect::new("/", jar)
    }
}

fn log_id(session_id: &str) -> String {
    session_id.chars().take(8).collect()
}
