//! Read-only access to stored uploads and generated images.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use std::io::ErrorKind;
use std::path::Path as FsPath;
use std::sync::Arc;

use crate::error::AssistantError;
use crate::pipeline::upload::secure_filename;
use crate::server::AppState;

pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, AssistantError> {
    serve_file(&state.config.upload_dir, &name).await
}

pub async fn temp_image(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, AssistantError> {
    serve_file(&state.config.temp_dir, &name).await
}

/// Send `dir/name` if `name` is already a sanitized single component.
pub async fn serve_file(dir: &FsPath, name: &str) -> Result<Response, AssistantError> {
    let not_found = || AssistantError::NotFound(format!("File not found: {name}"));
    if name.is_empty() || secure_filename(name) != name {
        return Err(not_found());
    }

    let path = dir.join(name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            return Err(AssistantError::Internal(format!(
                "reading {}: {}",
                path.display(),
                e
            )))
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(CONTENT_TYPE, mime.essence_str().to_string())], bytes).into_response())
}
