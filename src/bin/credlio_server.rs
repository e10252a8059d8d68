//!
//! credlio server binary
//! ---------------------
//! Command-line entry point for the Credlio HTTP server. Configuration comes from
//! `CREDLIO_*` environment variables; `--http-port` overrides the environment.

use anyhow::{Context, Result};
use std::env;

use credlio::config::{AppConfig, DEFAULT_HTTP_PORT, ENV_HTTP_PORT};

fn parse_port_arg(args: &[String], flag: &str) -> Result<Option<u16>> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            let raw = args.get(i + 1).with_context(|| format!("{} needs a value", flag))?;
            let port = raw.parse::<u16>().with_context(|| format!("{} {} is not a port", flag, raw))?;
            return Ok(Some(port));
        }
        i += 1;
    }
    Ok(None)
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!(
            "credlio server\n\nUSAGE:\n  credlio_server [--http-port N]\n\nOPTIONS:\n  --http-port N   HTTP port (env: {}, default {})\n\nENVIRONMENT:\n  CREDLIO_AUTH_URL, CREDLIO_AUTH_ANON_KEY, CREDLIO_AUTH_SERVICE_KEY\n  CREDLIO_STRIPE_SECRET_KEY, CREDLIO_STRIPE_PRICE_TIER_1, CREDLIO_STRIPE_PRICE_TIER_2\n  CREDLIO_PRODUCTION_READY, CREDLIO_ENFORCE_PRODUCTION, CREDLIO_CONNECT_TIMEOUT_SECS\n",
            ENV_HTTP_PORT, DEFAULT_HTTP_PORT
        );
        return Ok(());
    }

    let mut config = AppConfig::from_env().context("reading configuration from environment")?;
    // CLI overrides environment
    if let Some(port) = parse_port_arg(&args, "--http-port")? {
        config.http_port = port;
    }

    credlio::server::run(config).await
}
