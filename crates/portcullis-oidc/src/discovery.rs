//! Provider metadata discovery.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OidcError, Result};

/// Well-known path of the provider metadata document.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// The subset of the provider metadata document the gateway uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
}

impl ProviderMetadata {
    /// Parse the authorization endpoint, which every login redirect is built on.
    pub fn authorization_url(&self) -> Result<Url> {
        Url::parse(&self.authorization_endpoint).map_err(|e| {
            OidcError::Discovery(format!(
                "invalid authorization_endpoint '{}': {}",
                self.authorization_endpoint, e
            ))
        })
    }
}

/// URL of the metadata document for a provider base URL.
pub fn discovery_url(provider_url: &str) -> String {
    format!("{}{}", provider_url.trim_end_matches('/'), DISCOVERY_PATH)
}

/// Fetch and decode the provider metadata document.
pub async fn discover(http: &reqwest::Client, provider_url: &str) -> Result<ProviderMetadata> {
    let url = discovery_url(provider_url);
    tracing::debug!(url = %url, "Fetching OIDC provider metadata");

    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| OidcError::Discovery(format!("failed to fetch provider config: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(OidcError::Discovery(format!(
            "provider config request failed with status: {}",
            status.as_u16()
        )));
    }

    let metadata: ProviderMetadata = response
        .json()
        .await
        .map_err(|e| OidcError::Discovery(format!("failed to decode provider config: {}", e)))?;

    metadata.authorization_url()?;

    tracing::info!(
        issuer = %metadata.issuer,
        authorization_endpoint = %metadata.authorization_endpoint,
        "Discovered OIDC provider"
    );

    Ok(metadata)
}
