//! Start command - runs the gateway until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use portcullis_config::GatewayConfig;
use portcullis_server::Gateway;
use portcullis_session::{MemorySessionStore, StoreConfig};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Run the start command.
pub async fn run(args: StartArgs, mut config: GatewayConfig, ctx: &Context) -> Result<()> {
    if let Some(bind) = args.bind {
        config.server.host = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!(
        config = %ctx.config_source.display(),
        listen = %config.listen_address(),
        provider = %config.oidc.provider_url,
        routes = config.proxy.routes.len(),
        "Starting Portcullis"
    );

    let store = Arc::new(MemorySessionStore::new(
        StoreConfig::new()
            .with_sweep(true)
            .with_sweep_interval(Duration::from_secs(config.session.sweep_interval_secs)),
    ));

    let gateway = Gateway::from_config(config, store.clone())
        .await
        .context("failed to initialise gateway")?;

    let result = gateway.run(shutdown_signal()).await;

    store.shutdown().await;
    tracing::info!(sessions = store.len(), "Session store closed");

    result.context("gateway stopped with an error")
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown requested, draining connections");
}
