//! File Upload and Download Routes
//!
//! Only files under the configured temp directory are ever served.

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::{Result, ServiceError};
use crate::server::routes::{multipart_error, multipart_rejection};
use crate::server::server_core::AppState;
use crate::server::types::{NoticeResponse, UploadResponse};
use crate::synthesis::SynthesisMode;
use crate::voice::UploadedFile;

/// Response header naming the path that produced generated audio
pub const SYNTHESIS_MODE_HEADER: HeaderName = HeaderName::from_static("x-synthesis-mode");

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub file: Option<String>,
}

/// Read a WAV from disk into a response
pub async fn wav_response(
    path: &Path,
    download_name: Option<&str>,
    mode: Option<SynthesisMode>,
) -> Result<Response> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ServiceError::io(path, e))?;

    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    if let Some(name) = download_name {
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name))
            .map_err(|e| ServiceError::internal(format!("invalid download name: {}", e)))?;
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    if let Some(mode) = mode {
        headers.insert(SYNTHESIS_MODE_HEADER, HeaderValue::from_static(mode.as_str()));
    }
    Ok(response)
}

/// Resolve a requested path, refusing anything outside `root`
pub async fn resolve_served_path(root: &Path, requested: &str) -> Result<PathBuf> {
    let path = Path::new(requested);
    let lexically_inside = path.is_absolute()
        && !path.components().any(|c| matches!(c, Component::ParentDir))
        && path.starts_with(root);
    if !lexically_inside {
        return Err(ServiceError::forbidden("Invalid file path"));
    }

    let resolved = match tokio::fs::canonicalize(path).await {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServiceError::NotFound {
                what: "File",
                id: requested.to_string(),
            })
        }
        Err(e) => return Err(ServiceError::io(path, e)),
    };
    let resolved_root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| ServiceError::io(root, e))?;
    if !resolved.starts_with(&resolved_root) {
        return Err(ServiceError::forbidden("Invalid file path"));
    }

    let metadata = tokio::fs::metadata(&resolved)
        .await
        .map_err(|e| ServiceError::io(&resolved, e))?;
    if !metadata.is_file() {
        return Err(ServiceError::NotFound {
            what: "File",
            id: requested.to_string(),
        });
    }
    Ok(resolved)
}

/// Serve a generated WAV from the temp directory
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Response {
    let Some(requested) = query.file.filter(|f| !f.is_empty()) else {
        return ServiceError::validation("file", "No file specified").into_plain_response();
    };

    let served = async {
        let path = resolve_served_path(&state.config.storage.temp_dir, &requested).await?;
        debug!("Serving {}", path.display());
        wav_response(&path, None, None).await
    };

    match served.await {
        Ok(response) => response,
        Err(e) => e.into_plain_response(),
    }
}

/// Compatibility stub for `POST /file`
pub async fn file_endpoint() -> Json<NoticeResponse> {
    Json(NoticeResponse {
        message: "File endpoint (simulation mode)".to_string(),
    })
}

/// Store uploaded files in the temp directory and return their paths
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    match store_uploads(&state, multipart).await {
        Ok(files) if files.is_empty() => {
            ServiceError::validation("files", "No files provided").into_plain_response()
        }
        Ok(files) => Json(UploadResponse { files }).into_response(),
        Err(e) => e.into_plain_response(),
    }
}

async fn store_uploads(
    state: &AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Vec<String>> {
    let mut multipart = multipart.map_err(multipart_rejection)?;
    let mut stored = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(state, e))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let Some(filename) = field.file_name().filter(|f| !f.is_empty()).map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| multipart_error(state, e))?;
        let upload = UploadedFile {
            field: "files".to_string(),
            filename,
            bytes: bytes.to_vec(),
        };
        let path = state.ingest.persist(None, &upload).await?;
        stored.push(path.to_string_lossy().into_owned());
    }

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_refuses_outside_paths() {
        let root = tempfile::tempdir().unwrap();
        let inside = root.path().join("a.wav");
        std::fs::write(&inside, b"x").unwrap();

        let ok = resolve_served_path(root.path(), inside.to_str().unwrap()).await.unwrap();
        assert_eq!(ok, std::fs::canonicalize(&inside).unwrap());

        let traversal = format!("{}/../etc/passwd", root.path().display());
        assert!(matches!(
            resolve_served_path(root.path(), &traversal).await,
            Err(ServiceError::Forbidden { .. })
        ));
        assert!(matches!(
            resolve_served_path(root.path(), "/etc/passwd").await,
            Err(ServiceError::Forbidden { .. })
        ));
        assert!(matches!(
            resolve_served_path(root.path(), "a.wav").await,
            Err(ServiceError::Forbidden { .. })
        ));

        let missing = root.path().join("missing.wav");
        assert!(matches!(
            resolve_served_path(root.path(), missing.to_str().unwrap()).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_refuses_symlink_escape() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.wav");
        std::fs::write(&secret, b"x").unwrap();
        let link = root.path().join("link.wav");
        std::os::unix::fs::symlink(&secret, &link).unwrap();

        assert!(matches!(
            resolve_served_path(root.path(), link.to_str().unwrap()).await,
            Err(ServiceError::Forbidden { .. })
        ));
    }
}
