//! # hub-server
//!
//! Media host for InfluenceHub.
//!
//! This binary provides:
//! - **Object storage** over HTTP: authenticated uploads and public reads,
//!   laid out the way `hub-client`'s `HttpStorage` expects
//! - **Health** and welcome endpoints

mod api;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use hub_store::BlobStore;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hub_server=debug,tower_http=debug")),
        )
        .init();

    info!("Starting InfluenceHub server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    if config.api_key.is_none() {
        tracing::warn!("API_KEY is not set, uploads are unauthenticated");
    }

    // -----------------------------------------------------------------------
    // 3. Initialize storage (creates directory if missing)
    // -----------------------------------------------------------------------
    let blob_store = Arc::new(BlobStore::new(config.blob_storage_path.clone(), config.max_blob_size).await?);

    let http_addr = config.http_addr;
    let app_state = AppState {
        blob_store,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP server until it fails or Ctrl+C arrives
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
