//! Relaygate - Main Binary
//!
//! Loads and validates a broker configuration and reports how the realm's
//! authentication and authorization hooks would be wired.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use relaygate_core::{CallError, CallResult, Dict, UpstreamClient, Value};
use relaygate_node::{logging, BrokerConfig, RealmHooks};

/// Relaygate CLI
#[derive(Parser)]
#[command(name = "relaygate")]
#[command(about = "Relaygate - authentication and authorization for pub/sub routers")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/relaygate/relaygate.toml", env = "RELAYGATE_CONFIG")]
    config: PathBuf,

    /// Realm name (overrides config)
    #[arg(long, env = "RELAYGATE_REALM")]
    realm: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and print the realm wiring
    Check,

    /// Show version
    Version,
}

/// Upstream client for offline checks; no router is attached
struct Detached;

#[async_trait]
impl UpstreamClient for Detached {
    async fn call(&self, procedure: &str, _args: Vec<Value>, _kwargs: Dict) -> Result<CallResult, CallError> {
        Err(CallError::internal(format!("no router attached to call {procedure}")))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("Relaygate v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let mut config = BrokerConfig::load(&cli.config)?;

    // Apply CLI overrides
    if let Some(realm) = cli.realm {
        config.realm.name = realm;
    }

    // Initialize logging
    logging::init(&config.logging, cli.verbose)?;
    info!("Loaded configuration from {:?}", cli.config);

    config
        .validate()
        .with_context(|| format!("Invalid configuration in {:?}", cli.config))?;

    let hooks = RealmHooks::build(&config, Arc::new(Detached))?;

    println!("Configuration OK");
    println!("  Realm:           {}", hooks.realm());
    println!("  Auth methods:    {}", hooks.auth_methods().join(", "));
    println!("  Procedures:      {}", hooks.procedure_uris().join(", "));
    println!(
        "  Authorization:   {}",
        describe_authorization(&config)
    );
    println!(
        "  Publish filter:  {}",
        if config.filter.enabled { "enabled" } else { "disabled" }
    );

    Ok(())
}

fn describe_authorization(config: &BrokerConfig) -> String {
    let authz = &config.authorization;
    match (authz.feature.enabled, authz.dynamic.enabled) {
        (true, true) => format!("feature + dynamic (consent {:?}, fallback {:?})", authz.consent, authz.fallback),
        (true, false) => format!("feature (fallback {:?})", authz.fallback),
        (false, true) => format!("dynamic (fallback {:?})", authz.fallback),
        (false, false) => "none (all actions permitted)".to_string(),
    }
}
