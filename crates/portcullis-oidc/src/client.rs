//! Authorization-code flow against a discovered provider.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use portcullis_session::UserInfo;
use rand::RngCore;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use url::Url;

use crate::discovery::ProviderMetadata;
use crate::error::{OidcError, Result};
use crate::settings::OidcSettings;

/// Token endpoint response. Only the access token is used.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Generate a random state string for the authorization request.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Compare two state values in constant time.
pub fn states_match(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

/// HTTP client bound to one provider registration.
#[derive(Debug, Clone)]
pub struct OidcClient {
    http: reqwest::Client,
    settings: OidcSettings,
    metadata: ProviderMetadata,
    authorization_url: Url,
}

impl OidcClient {
    /// Build a client for already-discovered provider metadata.
    pub fn new(
        http: reqwest::Client,
        settings: OidcSettings,
        metadata: ProviderMetadata,
    ) -> Result<Self> {
        let authorization_url = metadata.authorization_url()?;
        Ok(Self {
            http,
            settings,
            metadata,
            authorization_url,
        })
    }

    /// Build the shared HTTP client used for every provider call.
    pub fn http_client(settings: &OidcSettings) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| OidcError::Config(format!("failed to build HTTP client: {}", e)))
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    pub fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    /// Authorization endpoint URL carrying the login parameters.
    ///
    /// Query parameters already on the endpoint are kept; the login
    /// parameters replace any of the same name.
    pub fn authorization_url(&self, state: &str) -> String {
        const LOGIN_PARAMS: [&str; 5] =
            ["client_id", "response_type", "scope", "redirect_uri", "state"];

        let mut url = self.authorization_url.clone();
        let existing: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !LOGIN_PARAMS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(existing)
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.settings.scope_param())
            .append_pair("redirect_uri", &self.settings.redirect_url)
            .append_pair("state", state);

        url.to_string()
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_url.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.metadata.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| OidcError::TokenExchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OidcError::TokenExchange(format!(
                "token request failed with status: {}",
                status.as_u16()
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| OidcError::TokenExchange(format!("failed to decode token response: {}", e)))?;

        if tokens.access_token.is_empty() {
            return Err(OidcError::TokenExchange(
                "token response has no access_token".to_string(),
            ));
        }

        Ok(tokens)
    }

    /// Fetch the user's identity claims with a bearer access token.
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo> {
        let response = self
            .http
            .get(&self.metadata.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OidcError::UserInfo(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OidcError::UserInfo(format!(
                "userinfo request failed with status: {}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OidcError::UserInfo(format!("failed to decode userinfo response: {}", e)))
    }
}
