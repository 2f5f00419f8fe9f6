//! Tracing subscriber setup: console output plus an optional rolling JSON file.

use anyhow::{Context as _, Result};
use portcullis_config::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

const WORKSPACE_CRATES: &[&str] = &[
    "portcullis",
    "portcullis_config",
    "portcullis_session",
    "portcullis_oidc",
    "portcullis_server",
];

/// Console filter directives when `RUST_LOG` is not set.
pub fn console_directives(level: &str, verbose: bool) -> String {
    if verbose {
        crate_directives(level, "debug")
    } else {
        level.to_string()
    }
}

/// `base` for everything, `crate_level` for the workspace crates.
fn crate_directives(base: &str, crate_level: &str) -> String {
    let mut directives = vec![base.to_string()];
    directives.extend(
        WORKSPACE_CRATES
            .iter()
            .map(|name| format!("{}={}", name, crate_level)),
    );
    directives.join(",")
}

/// Install the global subscriber.
///
/// Returns the file writer guard when file logging is enabled; dropping it
/// flushes and stops the writer.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(console_directives(&config.level, verbose))
            .with_context(|| format!("invalid log level '{}'", config.level))?,
    };

    let console: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(console_filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(console_filter)
            .boxed(),
    };

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "portcullis.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(crate_directives("info", "trace")));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_directives() {
        assert_eq!(console_directives("warn", false), "warn");

        let verbose = console_directives("info", true);
        assert!(verbose.starts_with("info,"));
        assert!(verbose.contains("portcullis_server=debug"));
        assert!(EnvFilter::try_new(verbose).is_ok());
    }
}
