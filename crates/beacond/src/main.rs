//! beacond — the Beacon daemon.
//!
//! Single binary that assembles the Beacon subsystems:
//! - Endpoint registry
//! - Probe coordinator
//! - REST API
//!
//! # Usage
//!
//! ```text
//! beacond serve --config beacon.toml --port 8000
//! beacond check --config beacon.toml
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use beacon_health::{Coordinator, HttpProbe};
use beacon_state::{EndpointId, Registry};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{BeaconConfig, EndpointSeed};

#[derive(Parser)]
#[command(name = "beacond", about = "Beacon uptime daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API.
    Serve {
        /// Path to a beacon.toml file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Probe the configured endpoints once and print the results as JSON.
    Check {
        /// Path to a beacon.toml file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve { config, port } => {
            let config = BeaconConfig::load(config.as_deref())?;
            run_serve(config, port).await
        }
        Command::Check { config } => {
            let config = BeaconConfig::load(config.as_deref())?;
            run_check(config).await
        }
    }
}

/// Logs go to stderr so `check` output on stdout stays machine-readable.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,beacond=debug,beacon_health=debug,beacon_state=debug")
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_coordinator(config: &BeaconConfig) -> anyhow::Result<Coordinator> {
    let timeout = config.probe_timeout();
    let probe = HttpProbe::with_timeout(timeout).context("failed to create HTTP probe")?;
    info!(timeout_ms = timeout.as_millis() as u64, "probe coordinator initialized");
    Ok(Coordinator::with_probe(probe))
}

/// Register the configured endpoints, in file order.
fn register_seeds(registry: &Registry, seeds: &[EndpointSeed]) -> anyhow::Result<Vec<EndpointId>> {
    seeds
        .iter()
        .map(|seed| {
            registry
                .create(seed.url.as_str(), seed.name.as_str(), seed.expected_status)
                .map(|endpoint| endpoint.id)
                .with_context(|| format!("invalid endpoint {:?} ({})", seed.name, seed.url))
        })
        .collect()
}

async fn run_serve(config: BeaconConfig, port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Beacon daemon starting");

    let registry = Registry::new();
    let seeded = register_seeds(&registry, &config.endpoints)?;
    info!(count = seeded.len(), "endpoints registered from config");

    let coordinator = build_coordinator(&config)?;

    let router = beacon_api::build_router(registry, coordinator);
    let port = port_override.unwrap_or(config.server.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("Beacon daemon stopped");
    Ok(())
}

async fn run_check(config: BeaconConfig) -> anyhow::Result<()> {
    if config.endpoints.is_empty() {
        anyhow::bail!("no endpoints configured; add [[endpoints]] entries to the config file");
    }

    let registry = Registry::new();
    let ids = register_seeds(&registry, &config.endpoints)?;
    let coordinator = build_coordinator(&config)?;

    let refreshed = coordinator.check_now(&registry, &ids).await;
    println!("{}", serde_json::to_string_pretty(&refreshed)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(url: &str, name: &str, expected_status: u16) -> EndpointSeed {
        EndpointSeed {
            url: url.to_string(),
            name: name.to_string(),
            expected_status,
        }
    }

    #[test]
    fn cli_parses_serve_with_overrides() {
        let cli = Cli::parse_from(["beacond", "serve", "--config", "b.toml", "--port", "9000"]);
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, Some(PathBuf::from("b.toml")));
                assert_eq!(port, Some(9000));
            }
            Command::Check { .. } => panic!("expected serve"),
        }
        assert!(!cli.log_json);
    }

    #[test]
    fn cli_parses_check_with_json_logs() {
        let cli = Cli::parse_from(["beacond", "check", "--log-json"]);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Command::Check { config: None }));
    }

    #[test]
    fn seeds_register_in_order() {
        let registry = Registry::new();
        let ids = register_seeds(
            &registry,
            &[seed("http://a", "a", 200), seed("https://b", "b", 204)],
        )
        .unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(registry.get(2).unwrap().expected_status, 204);
    }

    #[test]
    fn invalid_seed_is_reported() {
        let registry = Registry::new();
        let err = register_seeds(&registry, &[seed("example.com", "bad", 200)]).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[tokio::test]
    async fn check_without_endpoints_fails() {
        let err = run_check(BeaconConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("no endpoints configured"));
    }
}
