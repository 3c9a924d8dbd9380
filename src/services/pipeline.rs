//! Ingestion and retrieval over an embedding service and a vector store.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{IngestError, SearchError, VectorStoreError};
use crate::models::{DocumentChunk, QueryFailurePolicy, SearchQuery};
use crate::services::{EmbeddingService, TextChunker, VectorStore};

/// Outcome of storing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub file_path: String,
    pub chunks: usize,
}

/// Parameters for storing one document.
#[derive(Debug, Clone)]
pub struct StoreRequest<'a> {
    pub file_path: &'a str,
    pub text: &'a str,
    pub embedding_model: &'a str,
    pub api_key: &'a str,
    pub collection_name: &'a str,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

pub struct RetrievalPipeline {
    embedding: EmbeddingService,
    store: Arc<dyn VectorStore>,
    failure_policy: QueryFailurePolicy,
}

impl RetrievalPipeline {
    pub fn new(embedding: EmbeddingService, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding,
            store,
            failure_policy: QueryFailurePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: QueryFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn failure_policy(&self) -> QueryFailurePolicy {
        self.failure_policy
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Chunk, embed and write a document.
    ///
    /// Chunks are written in a single add after every vector is computed, so
    /// a failure leaves the collection untouched.
    pub async fn store_document(&self, req: StoreRequest<'_>) -> Result<IngestReport, IngestError> {
        let chunker = TextChunker::new(req.chunk_size, req.chunk_overlap)?;
        self.store
            .get_or_create_collection(req.collection_name)
            .await?;

        let texts = chunker.chunk(req.text);
        if texts.is_empty() {
            info!(file = req.file_path, collection = req.collection_name, "no text to store");
            return Ok(IngestReport {
                collection: req.collection_name.to_string(),
                file_path: req.file_path.to_string(),
                chunks: 0,
            });
        }

        let vectors = self
            .embedding
            .embed(&texts, req.embedding_model, req.api_key)
            .await?;

        let chunks: Vec<DocumentChunk> = texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (content, vector))| {
                DocumentChunk::new(req.file_path, i as u32, content, vector)
            })
            .collect();
        let count = chunks.len();

        self.store.add(req.collection_name, chunks).await?;

        info!(
            file = req.file_path,
            collection = req.collection_name,
            chunks = count,
            model = req.embedding_model,
            "stored document"
        );

        Ok(IngestReport {
            collection: req.collection_name.to_string(),
            file_path: req.file_path.to_string(),
            chunks: count,
        })
    }

    /// Ranked chunk texts for a query, failing on any error.
    pub async fn similarity_search(&self, query: &SearchQuery) -> Result<Vec<String>, SearchError> {
        if query.query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("query is empty".to_string()));
        }

        if self.store.get_collection(&query.collection_name).await?.is_none() {
            return Err(VectorStoreError::CollectionNotFound(query.collection_name.clone()).into());
        }

        let vector = self
            .embedding
            .embed_query(&query.query, &query.embedding_model, &query.api_key)
            .await?;

        let hits = self
            .store
            .query(&query.collection_name, &vector, query.n_results)
            .await?;

        Ok(hits.into_iter().map(|hit| hit.content).collect())
    }

    /// Search using the pipeline's configured failure policy.
    pub async fn query(&self, query: &SearchQuery) -> Result<Vec<String>, SearchError> {
        self.query_with_policy(query, self.failure_policy).await
    }

    /// Search with an explicit failure policy.
    ///
    /// Under [`QueryFailurePolicy::Soft`] any failure is logged and yields no
    /// results.
    pub async fn query_with_policy(
        &self,
        query: &SearchQuery,
        policy: QueryFailurePolicy,
    ) -> Result<Vec<String>, SearchError> {
        match self.similarity_search(query).await {
            Ok(results) => Ok(results),
            Err(e) if policy == QueryFailurePolicy::Soft => {
                warn!(
                    collection = %query.collection_name,
                    model = %query.embedding_model,
                    error = %e,
                    "similarity search failed, returning no results"
                );
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
