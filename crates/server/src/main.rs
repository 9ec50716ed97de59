//! updraft server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use updraft_core::config::AppConfig;
use updraft_server::{AppState, create_router};

/// updraft - self-hosted update delivery for React Native apps
#[derive(Parser, Debug)]
#[command(name = "updraftd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "UPDRAFT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("updraft v{}", env!("CARGO_PKG_VERSION"));

    // Layered configuration: optional TOML file, then UPDRAFT_* env vars.
    // Everything has a default, so the server also runs bare.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("no config file found at {}", args.config);
    }

    let mut config: AppConfig = figment
        .merge(Env::prefixed("UPDRAFT_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    apply_contract_env(&mut config);

    // Initialize the blob store and verify it is reachable before binding.
    let storage = updraft_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!(backend = storage.backend_name(), "storage backend ready");

    // Initialize the metadata store (runs migrations).
    let metadata = updraft_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata health check failed")?;
    tracing::info!("metadata store ready");

    if config.server.upload_secret_key.is_some() {
        tracing::info!("upload secret configured, upload-key header required");
    }

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .context("invalid bind address")?;

    let state = AppState::new(config, storage, metadata);
    let app = create_router(state);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Apply the deployment-contract environment variables on top of the
/// loaded configuration: `PUBLIC_URL`, `ENVIRONMENT`, `UPLOAD_SECRET_KEY`.
fn apply_contract_env(config: &mut AppConfig) {
    if let Ok(public_url) = std::env::var("PUBLIC_URL")
        && !public_url.is_empty()
    {
        config.server.public_url = public_url;
    }
    if let Ok(environment) = std::env::var("ENVIRONMENT")
        && !environment.is_empty()
    {
        config.server.environment = environment;
    }
    if let Ok(secret) = std::env::var("UPLOAD_SECRET_KEY")
        && !secret.is_empty()
    {
        config.server.upload_secret_key = Some(secret);
    }
}
