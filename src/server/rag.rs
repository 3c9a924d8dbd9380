//! Ingestion, retrieval and workflow endpoints.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use super::AppState;
use super::error::ApiError;
use super::protocol::{IngestRequest, IngestResponse, QueryRequest, QueryResponse};
use crate::models::{QueryFailurePolicy, WorkflowRequest, WorkflowResponse};
use crate::services::{DocumentProcessor, StoreRequest, guess_content_type};

/// Resolve `file_path` and require it to live under the upload directory.
fn resolve_upload_path(upload_dir: &Path, file_path: &str) -> Result<PathBuf, ApiError> {
    let path = PathBuf::from(file_path);
    let canonical = path
        .canonicalize()
        .map_err(|_| ApiError::NotFound(format!("file not found: {}", file_path)))?;
    let root = upload_dir
        .canonicalize()
        .map_err(|_| ApiError::NotFound(format!("file not found: {}", file_path)))?;

    if !canonical.starts_with(&root) || !canonical.is_file() {
        return Err(ApiError::BadRequest(format!(
            "{} is not an uploaded file",
            file_path
        )));
    }
    Ok(canonical)
}

/// Extract an uploaded file and store it in a collection.
pub async fn ingest_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let config = &state.ctx.config;
    let path = resolve_upload_path(&config.storage.upload_dir, &req.file_path)?;

    let content_type = req
        .content_type
        .clone()
        .unwrap_or_else(|| guess_content_type(&path));
    let extract_path = path.clone();
    let text = tokio::task::spawn_blocking(move || {
        DocumentProcessor::extract(&extract_path, &content_type)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("extraction task failed: {}", e)))?;

    let embedding_model = req
        .embedding_model
        .as_deref()
        .unwrap_or(&config.embedding.default_model);
    let collection_name = req
        .collection_name
        .as_deref()
        .unwrap_or(&config.indexing.default_collection);

    let report = state
        .ctx
        .pipeline
        .store_document(StoreRequest {
            file_path: &req.file_path,
            text: &text,
            embedding_model,
            api_key: req.api_key.as_deref().unwrap_or_default(),
            collection_name,
            chunk_size: req.chunk_size.unwrap_or(config.indexing.chunk_size),
            chunk_overlap: req.chunk_overlap.unwrap_or(config.indexing.chunk_overlap),
        })
        .await?;

    Ok(Json(IngestResponse {
        collection_name: report.collection,
        file_path: report.file_path,
        chunks: report.chunks,
    }))
}

/// Ranked chunk texts for a query.
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let pipeline = &state.ctx.pipeline;
    let policy = req
        .strict
        .map(QueryFailurePolicy::from_strict)
        .unwrap_or(pipeline.failure_policy());

    let query = state.ctx.search_query(
        req.query,
        req.embedding_model,
        req.api_key,
        req.collection_name,
        req.n_results,
    );
    let results = pipeline.query_with_policy(&query, policy).await?;

    Ok(Json(QueryResponse { results }))
}

pub async fn run_workflow_handler(Json(req): Json<WorkflowRequest>) -> Json<WorkflowResponse> {
    Json(req.run())
}
