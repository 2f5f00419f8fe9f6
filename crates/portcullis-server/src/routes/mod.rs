//! HTTP endpoints served by the gateway itself.

pub mod auth;
pub mod health;

pub use auth::{callback_handler, logout_handler, userinfo_handler};
pub use health::{HealthResponse, health_routes};
