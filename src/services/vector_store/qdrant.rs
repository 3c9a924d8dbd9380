//! Qdrant vector store backend implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use tracing::debug;

use super::{CollectionInfo, VectorStore, batch_dimension, validate_collection_name};
use crate::error::VectorStoreError;
use crate::models::{ChunkMetadata, DocumentChunk, SearchResult, VectorDriver, VectorStoreConfig};
use crate::utils::retry::{RetryPolicy, with_retry};

/// Qdrant vector store backend.
///
/// Qdrant needs the vector size up front, so a collection requested before its
/// first add is remembered locally and created on that add.
pub struct QdrantBackend {
    client: Qdrant,
    url: String,
    pending: Mutex<HashSet<String>>,
    /// Serializes deferred collection creation within this process.
    create_lock: tokio::sync::Mutex<()>,
    retry: RetryPolicy,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            pending: Mutex::new(HashSet::new()),
            create_lock: tokio::sync::Mutex::new(()),
            retry: RetryPolicy::default(),
        })
    }

    fn is_pending(&self, name: &str) -> bool {
        self.pending
            .lock()
            .map(|p| p.contains(name))
            .unwrap_or(false)
    }

    fn set_pending(&self, name: &str, pending: bool) {
        if let Ok(mut set) = self.pending.lock() {
            if pending {
                set.insert(name.to_string());
            } else {
                set.remove(name);
            }
        }
    }

    /// Collection info as stored on the server, `None` if it does not exist.
    async fn remote_info(&self, name: &str) -> Result<Option<CollectionInfo>, VectorStoreError> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;
        if !exists {
            return Ok(None);
        }

        let info = self
            .client
            .collection_info(name)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        let result = info.result;
        let count = result.as_ref().and_then(|r| r.points_count).unwrap_or(0);
        let dimension = result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|kind| match kind {
                VectorsConfigKind::Params(params) => Some(params.size as usize),
                _ => None,
            });

        Ok(Some(CollectionInfo {
            name: name.to_string(),
            dimension,
            count,
        }))
    }

    /// Create a pending collection sized for `dimension`.
    ///
    /// Another writer may create it first, either a concurrent add in this
    /// process or a different process. Both cases count as success as long as
    /// the existing collection has the same dimension.
    async fn create_pending(&self, collection: &str, dimension: usize) -> Result<(), VectorStoreError> {
        let _guard = self.create_lock.lock().await;

        if let Some(info) = self.remote_info(collection).await? {
            self.set_pending(collection, false);
            return check_dimension(&info, dimension);
        }

        debug!(collection, dimension, "creating qdrant collection");
        let create = CreateCollectionBuilder::new(collection)
            .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine));
        let created = self
            .client
            .create_collection(create)
            .await
            .map(|_| ())
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()));

        let existing = match created {
            Ok(()) => None,
            Err(_) => self.remote_info(collection).await.ok().flatten(),
        };
        settle_create(created, existing.as_ref(), dimension)?;
        self.set_pending(collection, false);
        Ok(())
    }
}

fn check_dimension(info: &CollectionInfo, dimension: usize) -> Result<(), VectorStoreError> {
    match info.dimension {
        Some(expected) if expected != dimension => Err(VectorStoreError::DimensionMismatch {
            collection: info.name.clone(),
            expected,
            actual: dimension,
        }),
        _ => Ok(()),
    }
}

/// A failed create is fine if the collection now exists with a matching size.
fn settle_create(
    created: Result<(), VectorStoreError>,
    existing: Option<&CollectionInfo>,
    dimension: usize,
) -> Result<(), VectorStoreError> {
    match (created, existing) {
        (Ok(()), _) => Ok(()),
        (Err(_), Some(info)) => check_dimension(info, dimension),
        (Err(e), None) => Err(e),
    }
}

fn chunk_payload(chunk: &DocumentChunk) -> HashMap<String, Value> {
    let mut payload: HashMap<String, Value> = HashMap::new();
    payload.insert("id".to_string(), chunk.id.clone().into());
    payload.insert("document".to_string(), chunk.content.clone().into());
    payload.insert(
        "file_path".to_string(),
        chunk.metadata.file_path.clone().into(),
    );
    payload.insert(
        "chunk_index".to_string(),
        i64::from(chunk.metadata.chunk_index).into(),
    );
    payload
}

fn payload_str<'a>(payload: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::StringValue(s)) => Some(s.as_str()),
        _ => None,
    })
}

fn payload_int(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::IntegerValue(n)) => Some(*n),
        _ => None,
    })
}

fn result_from_payload(payload: &HashMap<String, Value>, score: f32) -> SearchResult {
    let metadata = match (
        payload_str(payload, "file_path"),
        payload_int(payload, "chunk_index"),
    ) {
        (Some(file_path), Some(index)) => Some(ChunkMetadata {
            file_path: file_path.to_string(),
            chunk_index: index as u32,
        }),
        _ => None,
    };

    SearchResult {
        id: payload_str(payload, "id").unwrap_or_default().to_string(),
        content: payload_str(payload, "document").unwrap_or_default().to_string(),
        metadata,
        // Qdrant reports cosine similarity
        distance: 1.0 - score,
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn get_or_create_collection(
        &self,
        name: &str,
    ) -> Result<CollectionInfo, VectorStoreError> {
        validate_collection_name(name)?;
        if let Some(info) = self.remote_info(name).await? {
            return Ok(info);
        }
        self.set_pending(name, true);
        Ok(CollectionInfo::empty(name))
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>, VectorStoreError> {
        if let Some(info) = self.remote_info(name).await? {
            return Ok(Some(info));
        }
        Ok(self.is_pending(name).then(|| CollectionInfo::empty(name)))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VectorStoreError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        let mut names: Vec<String> = response
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect();
        if let Ok(pending) = self.pending.lock() {
            names.extend(pending.iter().cloned());
        }
        names.sort();
        names.dedup();

        let mut infos = Vec::with_capacity(names.len());
        for name in names {
            let info = self
                .remote_info(&name)
                .await?
                .unwrap_or_else(|| CollectionInfo::empty(&name));
            infos.push(info);
        }
        Ok(infos)
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, VectorStoreError> {
        let was_pending = self.is_pending(name);
        self.set_pending(name, false);

        if self.remote_info(name).await?.is_none() {
            return Ok(was_pending);
        }

        self.client
            .delete_collection(name)
            .await
            .map(|r| r.result)
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))
    }

    async fn add(
        &self,
        collection: &str,
        chunks: Vec<DocumentChunk>,
    ) -> Result<(), VectorStoreError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let dimension = batch_dimension(collection, &chunks)?;

        match self.remote_info(collection).await? {
            Some(info) => check_dimension(&info, dimension)?,
            None if self.is_pending(collection) => {
                self.create_pending(collection, dimension).await?;
            }
            None => return Err(VectorStoreError::CollectionNotFound(collection.to_string())),
        }

        let points: Vec<PointStruct> = chunks
            .iter()
            .map(|chunk| {
                PointStruct::new(
                    DocumentChunk::point_uuid(&chunk.id),
                    chunk.vector.clone(),
                    chunk_payload(chunk),
                )
            })
            .collect();

        let client = &self.client;
        let points = &points;
        with_retry(&self.retry, "qdrant.upsert", || async move {
            client
                .upsert_points(UpsertPointsBuilder::new(collection, points.clone()).wait(true))
                .await
                .map_err(|e| VectorStoreError::UpsertError(e.to_string()))
        })
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        n_results: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        let Some(info) = self.get_collection(collection).await? else {
            return Err(VectorStoreError::CollectionNotFound(collection.to_string()));
        };
        if info.count == 0 || n_results == 0 {
            return Ok(Vec::new());
        }

        let client = &self.client;
        let results = with_retry(&self.retry, "qdrant.search", || async move {
            let search = SearchPointsBuilder::new(collection, vector.to_vec(), n_results as u64)
                .with_payload(true);
            client
                .search_points(search)
                .await
                .map_err(|e| VectorStoreError::SearchError(e.to_string()))
        })
        .await?;

        Ok(results
            .result
            .iter()
            .map(|point| result_from_payload(&point.payload, point.score))
            .collect())
    }

    fn driver(&self) -> VectorDriver {
        VectorDriver::Qdrant
    }

    fn location(&self) -> String {
        self.url.clone()
    }
}
