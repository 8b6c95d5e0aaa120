use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use hub_store::BlobStore;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub blob_store: Arc<BlobStore>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let origin = match state.config.allowed_origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(
                value = %state.config.allowed_origin,
                "Invalid ALLOWED_ORIGIN, allowing any origin"
            );
            AllowOrigin::any()
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .route("/storage/v1/object/public/:bucket/*key", get(get_object))
        .route("/storage/v1/object/:bucket/*key", post(upload_object))
        .layer(DefaultBodyLimit::max(state.config.max_blob_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct WelcomeResponse {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: String,
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        name: "InfluenceHub",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn verify_api_key(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.api_key else {
        return Ok(());
    };

    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    // Constant-time comparison so the key cannot be guessed byte by byte.
    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len() || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1 {
        return Err(ServerError::Unauthorized);
    }

    Ok(())
}

async fn upload_object(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ServerError> {
    verify_api_key(&headers, &state.config)?;

    state.blob_store.put(&bucket, &key, &body).await?;
    info!(bucket = %bucket, key = %key, size = body.len(), "Object uploaded");

    Ok(Json(UploadResponse {
        key: format!("{bucket}/{key}"),
    }))
}

async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServerError> {
    let data = state.blob_store.get(&bucket, &key).await?;
    Ok(([(header::CONTENT_TYPE, content_type(&key))], data))
}

fn content_type(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
