//! # HTTP Handlers
//!
//! Handler axum per gli endpoint del server.
//!
//! ## Responsabilità:
//! - `health`: risposta di liveness
//! - `convert`: legge le parti multipart `files`, le salva in una directory
//!   temporanea per richiesta e converte il batch in `<output_dir>/<uuid>/`
//! - Nomi di upload in collisione ricevono un suffisso (`a-1.heic`), così
//!   ogni file ha il suo risultato
//! - Gli errori diventano `(StatusCode, Json<ErrorResponse>)`

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::state::AppState;
use crate::error::{ConvertError, ErrorKind};
use crate::file_manager::FileManager;

/// Multipart field carrying the uploaded images
const FILES_FIELD: &str = "files";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertedFile {
    pub original: String,
    pub converted: String,
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailedFile {
    pub original: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub converted: Vec<ConvertedFile>,
    pub failed: Vec<FailedFile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

fn convert_error(e: ConvertError) -> ApiError {
    let status = match e.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "heic-converter".to_string(),
    })
}

/// POST /convert
///
/// Converts every uploaded `files` part with a source extension and keeps
/// the JPEGs under `<output_dir>/<request id>/`.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| api_error(e.status(), e.body_text()))?;
    let config = state.config();

    let upload_dir = tempfile::Builder::new()
        .prefix("heic-upload-")
        .tempdir()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Cannot create upload directory: {}", e)))?;

    let mut received = 0usize;
    // staged file name -> name sent by the client
    let mut originals: HashMap<String, String> = HashMap::new();
    let mut taken_stems: HashSet<String> = HashSet::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(api_error(e.status(), format!("Invalid multipart body: {}", e.body_text()))),
        };

        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().and_then(sanitize_file_name) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| api_error(e.status(), format!("Failed to read {}: {}", filename, e.body_text())))?;
        received += 1;

        if !FileManager::is_source_file(Path::new(&filename), &config.source_extensions) {
            warn!("Ignoring upload with unsupported extension: {}", filename);
            continue;
        }

        let staged = staging_name(&filename, &mut taken_stems);
        tokio::fs::write(upload_dir.path().join(&staged), &bytes)
            .await
            .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to store {}: {}", filename, e)))?;
        originals.insert(staged, filename);
    }

    if received == 0 {
        return Err(api_error(StatusCode::BAD_REQUEST, "No files uploaded"));
    }

    let output_dir = config.server.output_dir.join(Uuid::new_v4().to_string());
    info!("Converting {} uploaded files into {}", received, output_dir.display());

    let results = state
        .converter()
        .convert_directory(upload_dir.path(), &output_dir)
        .await
        .map_err(convert_error)?;

    let mut converted = Vec::new();
    let mut failed = Vec::new();
    for result in results {
        let staged = file_name_of(result.task.source_path());
        let original = originals.remove(&staged).unwrap_or(staged);
        if result.success {
            let destination = result.task.destination_path();
            converted.push(ConvertedFile {
                original,
                converted: file_name_of(destination),
                path: destination.display().to_string(),
            });
        } else {
            failed.push(FailedFile {
                original,
                error: result.error_detail.unwrap_or_else(|| "conversion failed".to_string()),
            });
        }
    }

    Ok(Json(ConvertResponse {
        success: true,
        converted,
        failed,
    }))
}

/// Keep only the final path component of an uploaded file name
fn sanitize_file_name(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    let name = Path::new(&normalized).file_name()?.to_string_lossy().to_string();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

/// Name under which an upload is stored for conversion.
///
/// Uploads whose stems collide case-insensitively would write the same
/// JPEG, so later ones get a `-1`, `-2`, ... suffix.
fn staging_name(filename: &str, taken_stems: &mut HashSet<String>) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().to_string());

    let mut candidate = stem.clone();
    let mut counter = 1;
    while !taken_stems.insert(candidate.to_lowercase()) {
        candidate = format!("{}-{}", stem, counter);
        counter += 1;
    }

    match extension {
        Some(ext) => format!("{}.{}", candidate, ext),
        None => candidate,
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
