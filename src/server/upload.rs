//! Multipart upload endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use tracing::info;

use super::AppState;
use super::error::ApiError;
use super::protocol::{TextPreviewResponse, UploadResponse};
use crate::services::{DocumentProcessor, guess_content_type};
use crate::utils::{format_bytes, preview, sanitize_filename, upload_file_name};

const UPLOAD_PREVIEW_CHARS: usize = 200;
const LEGACY_PREVIEW_CHARS: usize = 500;

/// The `file` part of a multipart upload.
struct ReceivedFile {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

fn multipart_error(e: MultipartError, limit: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

/// Read the `file` field, enforcing `limit` while streaming.
async fn read_file_field(multipart: &mut Multipart, limit: u64) -> Result<ReceivedFile, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .filter(|ct| !ct.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(std::path::Path::new(&file_name)));

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
            if (data.len() + chunk.len()) as u64 > limit {
                return Err(ApiError::PayloadTooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(ReceivedFile {
            file_name,
            content_type,
            data,
        });
    }

    Err(ApiError::BadRequest(
        "missing multipart field 'file'".to_string(),
    ))
}

async fn save_and_extract(
    path: PathBuf,
    file: &ReceivedFile,
) -> Result<String, ApiError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &file.data).await?;

    let content_type = file.content_type.clone();
    tokio::task::spawn_blocking(move || DocumentProcessor::extract(&path, &content_type))
        .await
        .map_err(|e| ApiError::Internal(format!("extraction task failed: {}", e)))
}

/// Store an upload under a random name and return a text preview.
pub async fn upload_file_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let storage = &state.ctx.config.storage;
    let file = read_file_field(&mut multipart, storage.max_upload_bytes).await?;

    let path = storage.upload_dir.join(upload_file_name(&file.file_name));
    let text = save_and_extract(path.clone(), &file).await?;

    info!(
        filename = %file.file_name,
        path = %path.display(),
        size = %format_bytes(file.data.len() as u64),
        content_type = %file.content_type,
        "stored upload"
    );

    Ok(Json(UploadResponse {
        filename: file.file_name,
        file_path: path.display().to_string(),
        size: file.data.len() as u64,
        content_type: file.content_type,
        preview: preview(&text, UPLOAD_PREVIEW_CHARS),
    }))
}

/// Older upload endpoint that keeps the client's file name.
pub async fn knowledgebase_upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TextPreviewResponse>, ApiError> {
    let storage = &state.ctx.config.storage;
    let file = read_file_field(&mut multipart, storage.max_upload_bytes).await?;

    let name = sanitize_filename(&file.file_name)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid file name {:?}", file.file_name)))?;
    let path = storage.upload_dir.join(format!("temp_{}", name));
    let text = save_and_extract(path, &file).await?;

    Ok(Json(TextPreviewResponse {
        filename: file.file_name,
        text_preview: preview(&text, LEGACY_PREVIEW_CHARS),
    }))
}
