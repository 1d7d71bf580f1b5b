//! # HTTP Server Module
//!
//! Endpoint HTTP minimale sopra il `DirectoryConverter`:
//! - `GET /health`: liveness
//! - `POST /convert`: upload multipart (campo `files`), conversione sincrona
//!
//! Le directory di output per richiesta vengono rimosse dopo
//! `server.retention_secs` da uno sweep in background (`cleanup`).
//!
//! Gli errori di una richiesta diventano sempre una risposta JSON
//! `{ "error": ... }`; il processo server non termina mai per una richiesta.

pub mod cleanup;
pub mod handlers;
pub mod state;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config().server.max_upload_bytes;
    let cors = cors_layer(&state.config().server.allowed_origins);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/convert", post(handlers::convert))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(3600))
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let output_dir = state.config().server.output_dir.clone();
    let retention_secs = state.config().server.retention_secs;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HEIC converter listening on {}", addr);

    let sweeper = (retention_secs > 0)
        .then(|| cleanup::spawn_retention_sweep(output_dir, Duration::from_secs(retention_secs)));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
