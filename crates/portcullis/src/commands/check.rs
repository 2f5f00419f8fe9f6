//! Check command - validate configuration without serving.

use anyhow::{Context as _, Result};
use clap::Args;
use portcullis_config::GatewayConfig;
use portcullis_oidc::{OidcClient, OidcSettings, discover, discovery_url};
use portcullis_server::RouteTable;

use super::Context;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Also fetch the provider's discovery document
    #[arg(long)]
    pub discover: bool,
}

/// Run the check command.
pub async fn run(args: CheckArgs, config: GatewayConfig, ctx: &Context) -> Result<()> {
    let table = RouteTable::new(&config.proxy.routes).context("invalid route table")?;

    println!("Configuration OK: {}", ctx.config_source.display());
    println!("Listen: {}", config.listen_address());
    println!("Provider: {}", config.oidc.provider_url);
    println!();
    println!("Routes (match order):");
    for route in table.routes() {
        let mut flags = Vec::new();
        if route.strip_prefix {
            flags.push("strip");
        }
        if route.allow_websocket {
            flags.push("websocket");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", flags.join(", "))
        };
        println!("  {:<24} -> {}{}", route.prefix, route.upstream, flags);
    }

    if args.discover {
        let settings = OidcSettings::from_config(&config);
        let http = OidcClient::http_client(&settings)?;
        let metadata = discover(&http, &settings.provider_url)
            .await
            .with_context(|| {
                format!(
                    "discovery failed at {}",
                    discovery_url(&settings.provider_url)
                )
            })?;

        println!();
        println!("Provider metadata:");
        println!("  issuer:                 {}", metadata.issuer);
        println!("  authorization_endpoint: {}", metadata.authorization_endpoint);
        println!("  token_endpoint:         {}", metadata.token_endpoint);
        println!("  userinfo_endpoint:      {}", metadata.userinfo_endpoint);
    }

    if ctx.verbose {
        println!();
        println!(
            "Session cookie: {} (max age {}s)",
            config.session.cookie_name, config.session.max_age
        );
        println!(
            "Allowed origins: {}",
            config.security.allowed_origins.join(", ")
        );
    }

    Ok(())
}
