//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use super::protocol::ErrorResponse;
use crate::error::{EmbeddingError, IngestError, SearchError, VectorStoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("file exceeds the upload limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("search failed: {0}")]
    Search(#[from] SearchError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

fn embedding_status(e: &EmbeddingError) -> StatusCode {
    match e {
        EmbeddingError::MissingApiKey(_) => StatusCode::BAD_REQUEST,
        EmbeddingError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn store_status(e: &VectorStoreError) -> StatusCode {
    match e {
        VectorStoreError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
        VectorStoreError::InvalidCollectionName(_) | VectorStoreError::DimensionMismatch { .. } => {
            StatusCode::BAD_REQUEST
        }
        VectorStoreError::ConnectionError(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Ingest(IngestError::Chunk(_)) => StatusCode::BAD_REQUEST,
            ApiError::Ingest(IngestError::Embedding(e)) => embedding_status(e),
            ApiError::Ingest(IngestError::VectorStore(e)) => store_status(e),
            ApiError::Search(SearchError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            ApiError::Search(SearchError::Embedding(e)) => embedding_status(e),
            ApiError::Search(SearchError::VectorStore(e)) => store_status(e),
            ApiError::VectorStore(e) => store_status(e),
            ApiError::Io(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
            StatusCode::BAD_GATEWAY => "provider_error",
            StatusCode::SERVICE_UNAVAILABLE => "unavailable",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = ErrorResponse {
            message: self.to_string(),
            code: self.error_code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChunkError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from(IngestError::Chunk(ChunkError::ZeroSize)).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(IngestError::Embedding(EmbeddingError::Timeout)).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(SearchError::VectorStore(
                VectorStoreError::CollectionNotFound("docs".into())
            ))
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(SearchError::Embedding(EmbeddingError::MissingApiKey("openai")))
                .error_code(),
            "bad_request"
        );
        assert_eq!(
            ApiError::Internal("boom".into()).error_code(),
            "internal_error"
        );
    }
}
