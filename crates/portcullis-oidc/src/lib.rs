//! OpenID Connect authorization-code authenticator.
//!
//! Drives the browser login flow for the gateway and issues server-side
//! sessions through a [`portcullis_session::SessionStore`].
//!
//! # Components
//!
//! - [`discovery`]: provider metadata from `/.well-known/openid-configuration`
//! - [`client`]: authorization URL, code exchange, user-info fetch
//! - [`authenticator`]: gate check, login redirect, callback, logout
//!
//! ID-token signature verification, PKCE and token refresh are not performed.
//! The session lifetime is the configured max age, independent of the
//! access token's own expiry.

pub mod authenticator;
pub mod client;
mod cookies;
pub mod discovery;
pub mod error;
pub mod settings;

pub use authenticator::{AuthContext, AuthRedirect, Authenticator, CallbackParams};
pub use client::{OidcClient, TokenResponse, generate_state};
pub use cookies::STATE_COOKIE_NAME;
pub use discovery::{ProviderMetadata, discover, discovery_url};
pub use error::{OidcError, Result};
pub use settings::OidcSettings;
