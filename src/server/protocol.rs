//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::services::CollectionInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub vector_store: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub driver: String,
    pub location: String,
    pub collections: Vec<CollectionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Name the client uploaded the file under.
    pub filename: String,
    /// Where the file was stored on the server.
    pub file_path: String,
    pub size: u64,
    pub content_type: String,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPreviewResponse {
    pub filename: String,
    pub text_preview: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub file_path: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub chunk_overlap: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub collection_name: String,
    pub file_path: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub n_results: Option<usize>,
    /// Propagate failures instead of returning an empty result list.
    #[serde(default)]
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<String>,
}

/// `?query=` parameter of the stage endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryParam {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocsResponse {
    pub processed_docs: usize,
    pub next_step: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedQueryResponse {
    pub received_query: String,
    pub next_step: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputResponse {
    pub output: String,
}
