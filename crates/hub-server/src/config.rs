//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use hub_shared::constants::MAX_MEDIA_SIZE;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8000`
    pub http_addr: SocketAddr,

    /// Filesystem path where uploaded objects are stored.
    /// Env: `BLOB_STORAGE_PATH`
    /// Default: `./storage`
    pub blob_storage_path: PathBuf,

    /// Origin allowed by CORS (the dashboard front end).
    /// Env: `ALLOWED_ORIGIN`
    /// Default: `http://localhost:5173`
    pub allowed_origin: String,

    /// Maximum object size in bytes.
    /// Env: `MAX_BLOB_SIZE`
    /// Default: 50 MiB
    pub max_blob_size: usize,

    /// Bearer token required for uploads. Reads stay public.
    /// Env: `API_KEY`
    /// Default: unset (uploads open, development only).
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8000).into(),
            blob_storage_path: PathBuf::from("./storage"),
            allowed_origin: "http://localhost:5173".to_string(),
            max_blob_size: MAX_MEDIA_SIZE,
            api_key: None,
        }
    }
}

// The API key never shows up in logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("blob_storage_path", &self.blob_storage_path)
            .field("allowed_origin", &self.allowed_origin)
            .field("max_blob_size", &self.max_blob_size)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Some(path) = lookup("BLOB_STORAGE_PATH") {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Some(origin) = lookup("ALLOWED_ORIGIN") {
            if !origin.trim().is_empty() {
                config.allowed_origin = origin.trim().to_string();
            }
        }

        if let Some(val) = lookup("MAX_BLOB_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_blob_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_BLOB_SIZE, using default"),
            }
        }

        if let Some(key) = lookup("API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
