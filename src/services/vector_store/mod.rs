//! Vector store abstraction layer.
//!
//! A store holds named collections of embedded chunks. The SQLite backend keeps
//! everything in one local file and answers queries with an exact cosine scan;
//! the Qdrant backend maps each collection to a Qdrant collection.

mod qdrant;
mod sqlite;

pub use qdrant::QdrantBackend;
pub use sqlite::SqliteBackend;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::VectorStoreError;
use crate::models::{DocumentChunk, SearchResult, VectorDriver, VectorStoreConfig};

const MAX_COLLECTION_NAME_LEN: usize = 128;

/// Summary of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    /// Vector dimensionality, unknown until the first add.
    pub dimension: Option<usize>,
    pub count: u64,
}

impl CollectionInfo {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dimension: None,
            count: 0,
        }
    }
}

/// Operations every index backend supports.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Return the named collection, creating it when absent.
    async fn get_or_create_collection(&self, name: &str)
    -> Result<CollectionInfo, VectorStoreError>;

    /// Return the named collection, or `None` if it does not exist.
    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>, VectorStoreError>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VectorStoreError>;

    /// Drop a collection and its entries. Returns whether it existed.
    async fn delete_collection(&self, name: &str) -> Result<bool, VectorStoreError>;

    /// Insert or replace chunks in one atomic write.
    ///
    /// Every chunk must carry a vector of the collection's dimensionality.
    async fn add(&self, collection: &str, chunks: Vec<DocumentChunk>)
    -> Result<(), VectorStoreError>;

    /// Nearest neighbours of `vector` by cosine distance, closest first.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        n_results: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError>;

    fn driver(&self) -> VectorDriver;

    /// Where the index lives, for status output.
    fn location(&self) -> String;
}

/// Create a vector store backend based on configuration.
pub async fn create_backend(
    config: &VectorStoreConfig,
) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Sqlite => {
            let path = config.path.clone();
            let backend = tokio::task::spawn_blocking(move || SqliteBackend::open(&path))
                .await
                .map_err(|e| VectorStoreError::TaskError(e.to_string()))??;
            Ok(Arc::new(backend))
        }
        VectorDriver::Qdrant => Ok(Arc::new(QdrantBackend::new(config)?)),
    }
}

/// Reject names that are empty, too long, or contain characters other than
/// ASCII alphanumerics, `_`, `-` and `.`.
pub fn validate_collection_name(name: &str) -> Result<(), VectorStoreError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_COLLECTION_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(VectorStoreError::InvalidCollectionName(name.to_string()))
    }
}

/// Check that every chunk has the same non-zero dimensionality and return it.
pub(crate) fn batch_dimension(
    collection: &str,
    chunks: &[DocumentChunk],
) -> Result<usize, VectorStoreError> {
    let expected = chunks.first().map(DocumentChunk::dimension).unwrap_or(0);
    if expected == 0 {
        return Err(VectorStoreError::UpsertError(format!(
            "chunks for {} carry no vectors",
            collection
        )));
    }
    if let Some(bad) = chunks.iter().find(|c| c.dimension() != expected) {
        return Err(VectorStoreError::DimensionMismatch {
            collection: collection.to_string(),
            expected,
            actual: bad.dimension(),
        });
    }
    Ok(expected)
}
