//! CLI command handlers.

pub mod check;
pub mod start;

use std::path::PathBuf;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// File the configuration was loaded from.
    pub config_source: PathBuf,
    /// Verbose output enabled.
    pub verbose: bool,
}
