//! Error types for the OIDC authenticator.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OidcError>;

/// Errors that can occur while discovering the provider or completing a login.
#[derive(Debug, thiserror::Error)]
pub enum OidcError {
    /// Provider metadata could not be fetched or decoded.
    #[error("Failed to discover OIDC provider: {0}")]
    Discovery(String),

    /// A required callback query parameter was absent or empty.
    #[error("Missing {0}")]
    MissingParameter(&'static str),

    /// The callback `state` did not match the one issued at redirect.
    #[error("State mismatch")]
    StateMismatch,

    /// The token endpoint call failed or returned something unusable.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// The user-info endpoint call failed or returned something unusable.
    #[error("Failed to get user info: {0}")]
    UserInfo(String),

    /// Settings the authenticator cannot work with.
    #[error("Config error: {0}")]
    Config(String),
}

impl OidcError {
    /// True when the error was caused by the client's request rather than the provider.
    pub fn is_client_error(&self) -> bool {
        matches!(self, OidcError::MissingParameter(_) | OidcError::StateMismatch)
    }
}
