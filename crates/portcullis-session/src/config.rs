//! Configuration for the in-memory session store.

use std::time::Duration;

/// Default interval between background sweeps of expired sessions.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Configuration for [`MemorySessionStore`](crate::MemorySessionStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to run the periodic sweep of expired sessions.
    /// If false, expired sessions are only removed on access.
    pub enable_sweep: bool,

    /// Interval for the sweep task (if enabled).
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enable_sweep: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the background sweep.
    pub fn with_sweep(mut self, enabled: bool) -> Self {
        self.enable_sweep = enabled;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
