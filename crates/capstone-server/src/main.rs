//! Capstone server binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capstone_core::AppConfig;
use capstone_server::{AppState, OperationRegistry};
use capstone_server::blob::{FsBlobStore, UrlSigner};
use capstone_server::gateway::GatewayServer;
use capstone_server::ops;
use capstone_server::store::PgStore;

/// Capstone - academic project management backend.
#[derive(Parser)]
#[command(name = "capstone-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "capstone.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    tracing::info!("Starting capstone server...");

    let store = PgStore::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    store
        .ensure_schema()
        .await
        .context("Failed to prepare the database schema")?;
    tracing::info!("Database connected");

    let blobs = FsBlobStore::new(&config.storage.root);
    let signer = UrlSigner::new(
        config.storage.url_secret.clone(),
        config.storage.public_base_url.clone(),
    );
    let state = Arc::new(AppState::new(
        Arc::new(store),
        Arc::new(blobs),
        signer,
        config.storage.clone(),
    ));

    let mut registry = OperationRegistry::new();
    ops::register_all(&mut registry);
    tracing::info!(operations = registry.len(), "Operations registered");

    let server = GatewayServer::new(config.server.clone(), config.auth.clone(), registry, state);

    tokio::select! {
        result = server.run() => {
            result.context("Server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down...");
        }
    }

    Ok(())
}
