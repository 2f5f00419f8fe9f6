//! The session storage capability.

use std::sync::Arc;

use async_trait::async_trait;

use crate::record::SessionRecord;

/// Trait for session storage backends.
///
/// Operations never fail for transient reasons: a miss is the only
/// negative outcome, and callers treat it as "not authenticated".
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Look up a session.
    ///
    /// Returns `None` when the id is unknown or the record has expired.
    /// Expired records must never be returned.
    async fn get(&self, session_id: &str) -> Option<SessionRecord>;

    /// Store a session, overwriting any existing record with the same id.
    async fn put(&self, session_id: &str, record: SessionRecord);

    /// Remove a session. Removing an unknown id is not an error.
    async fn delete(&self, session_id: &str);
}

/// Shared, type-erased session store.
pub type SharedSessionStore = Arc<dyn SessionStore>;
