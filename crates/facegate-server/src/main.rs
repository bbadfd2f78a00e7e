//! facegate-server: face enrollment and verification over HTTP

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use facegate_config::load_resolved_config;
use facegate_face_core::runtime::build_service;
use facegate_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "facegate-server", version, about = "Face enrollment and verification service")]
struct Args {
    /// Read configuration from this file instead of the default locations
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the configured listen host
    #[arg(long, env = "FACEGATE_HOST")]
    host: Option<String>,

    /// Override the configured listen port
    #[arg(long, env = "FACEGATE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Starting facegate-server v{}", env!("CARGO_PKG_VERSION"));

    let loaded = load_resolved_config(args.config.as_deref()).context("failed to load configuration")?;
    match &loaded.source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("No configuration file found; using built-in defaults"),
    }
    let config = loaded.resolved;

    let service = build_service(&config).context("failed to initialise face service")?;
    info!(
        threshold = config.match_threshold,
        image_size = config.image_size,
        backend = config.store_backend.as_str(),
        max_body_bytes = config.max_body_bytes,
        store_dir = %config.store_dir.display(),
        "face service ready"
    );

    let host = args.host.unwrap_or_else(|| config.listen_host.clone());
    let port = args.port.unwrap_or(config.listen_port);
    let state = AppState::new(service, config.allowed_origins.clone())
        .with_body_limit(config.max_body_bytes);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    info!("facegate-server listening on http://{}", listener.local_addr()?);
    info!("Health check: http://{}/health", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
