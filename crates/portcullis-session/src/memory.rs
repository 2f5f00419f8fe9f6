//! In-memory session store with lazy expiry and a background sweep.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::record::{SessionRecord, short_id};
use crate::store::SessionStore;

type SessionMap = RwLock<HashMap<String, SessionRecord>>;

/// Handle to the running sweep task.
struct SweepTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Process-local session store.
///
/// All sessions live in one map behind a single `RwLock`: lookups share
/// the lock, inserts and removals take it exclusively. Records handed to
/// callers are clones, so nobody observes a half-written entry.
///
/// When [`StoreConfig::enable_sweep`] is set and a tokio runtime is
/// available, a background task removes expired sessions every
/// [`StoreConfig::sweep_interval`]. The task stops on [`close`](Self::close),
/// [`shutdown`](Self::shutdown), or when the store is dropped.
pub struct MemorySessionStore {
    sessions: Arc<SessionMap>,
    config: StoreConfig,
    sweep: Mutex<Option<SweepTask>>,
}

impl MemorySessionStore {
    /// Create a new store, starting the sweep task if enabled.
    pub fn new(config: StoreConfig) -> Self {
        let sessions = Arc::new(RwLock::new(HashMap::new()));

        let sweep = if config.enable_sweep {
            spawn_sweep(Arc::downgrade(&sessions), &config)
        } else {
            None
        };

        Self {
            sessions,
            config,
            sweep: Mutex::new(sweep),
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of stored sessions, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Check if the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Whether the background sweep is still running.
    pub fn is_sweeping(&self) -> bool {
        self.sweep
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Remove every expired session now and return how many were removed.
    ///
    /// The background task calls this on its interval; it can also be
    /// called directly.
    pub fn sweep_expired(&self) -> usize {
        sweep(&self.sessions)
    }

    /// Stop the sweep task. Safe to call more than once.
    pub fn close(&self) {
        if let Some(task) = self.sweep.lock().take() {
            task.cancel.cancel();
            debug!("Session sweep cancelled");
        }
    }

    /// Stop the sweep task and wait for it to finish.
    pub async fn shutdown(&self) {
        let task = self.sweep.lock().take();
        if let Some(task) = task {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!(error = %e, "Session sweep task ended abnormally");
            }
            debug!("Session sweep stopped");
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("sessions", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Drop for MemorySessionStore {
    fn drop(&mut self) {
        if let Some(task) = self.sweep.get_mut().take() {
            task.cancel.cancel();
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read();
            match sessions.get(session_id) {
                None => return None,
                Some(record) if !record.is_expired_at(now) => {
                    trace!(session = %short_id(session_id), "Session found");
                    return Some(record.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: drop it if the lock is free, otherwise the sweep will.
        if let Some(mut sessions) = self.sessions.try_write()
            && sessions
                .get(session_id)
                .is_some_and(|record| record.is_expired_at(now))
        {
            sessions.remove(session_id);
            debug!(session = %short_id(session_id), "Expired session removed on read");
        }

        None
    }

    async fn put(&self, session_id: &str, record: SessionRecord) {
        let mut sessions = self.sessions.write();
        sessions.insert(session_id.to_string(), record);
        trace!(
            session = %short_id(session_id),
            store_size = sessions.len(),
            "Session stored"
        );
    }

    async fn delete(&self, session_id: &str) {
        if self.sessions.write().remove(session_id).is_some() {
            debug!(session = %short_id(session_id), "Session deleted");
        }
    }
}

fn sweep(sessions: &SessionMap) -> usize {
    let now = Utc::now();
    let mut sessions = sessions.write();
    let before = sessions.len();
    sessions.retain(|_, record| !record.is_expired_at(now));
    let removed = before - sessions.len();

    if removed > 0 {
        debug!(count = removed, remaining = sessions.len(), "Swept expired sessions");
    }

    removed
}

fn spawn_sweep(sessions: Weak<SessionMap>, config: &StoreConfig) -> Option<SweepTask> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("No tokio runtime available, session sweep disabled");
        return None;
    };

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let period = config.sweep_interval;

    let handle = runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(sessions) = sessions.upgrade() else {
                        break;
                    };
                    sweep(&sessions);
                }
            }
        }
    });

    Some(SweepTask { cancel, handle })
}
