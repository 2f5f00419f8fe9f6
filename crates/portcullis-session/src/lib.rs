//! Server-side session storage with time-based expiry.
//!
//! This crate provides the session layer of the gateway:
//! - [`SessionStore`], the `get`/`put`/`delete` capability the authenticator
//!   depends on, so a shared backend can replace the in-memory one later
//! - [`MemorySessionStore`], a process-local store with lazy expiry on read
//!   and a cancellable background sweep
//! - [`SessionRecord`] and [`UserInfo`], the data bound to a session cookie
//!
//! # Example
//!
//! ```rust,ignore
//! use portcullis_session::{MemorySessionStore, SessionStore, StoreConfig};
//!
//! let store = MemorySessionStore::new(
//!     StoreConfig::default().with_sweep_interval(Duration::from_secs(300)),
//! );
//! store.put(&record.session_id, record.clone()).await;
//! ```

mod config;
mod memory;
mod record;
mod store;

pub use config::StoreConfig;
pub use memory::MemorySessionStore;
pub use record::{SessionRecord, UserInfo, generate_session_id};
pub use store::{SessionStore, SharedSessionStore};
