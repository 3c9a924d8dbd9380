//! Embedded SQLite index with exact cosine search.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{CollectionInfo, VectorStore, batch_dimension, validate_collection_name};
use crate::error::VectorStoreError;
use crate::models::{ChunkMetadata, DocumentChunk, SearchResult, VectorDriver};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS collections (
    name       TEXT PRIMARY KEY,
    dimension  INTEGER,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS embeddings (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    document   TEXT NOT NULL,
    metadata   TEXT NOT NULL,
    vector     BLOB NOT NULL,
    PRIMARY KEY (collection, id)
);
";

/// SQLite-backed vector store.
///
/// The connection sits behind a mutex and every call runs on the blocking pool.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Open (or create) the index file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, VectorStoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                VectorStoreError::ConnectionError(format!("{}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Non-persistent index, used by tests and one-off runs.
    pub fn in_memory() -> Result<Self, VectorStoreError> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, VectorStoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, VectorStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, VectorStoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| VectorStoreError::TaskError("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| VectorStoreError::TaskError(e.to_string()))?
    }
}

fn collection_info(conn: &Connection, name: &str) -> Result<Option<CollectionInfo>, VectorStoreError> {
    let info = conn
        .query_row(
            "SELECT c.dimension,
                    (SELECT COUNT(*) FROM embeddings e WHERE e.collection = c.name)
             FROM collections c WHERE c.name = ?1",
            params![name],
            |row| {
                let dimension: Option<i64> = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok(CollectionInfo {
                    name: name.to_string(),
                    dimension: dimension.map(|d| d as usize),
                    count: count as u64,
                })
            },
        )
        .optional()?;
    Ok(info)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// `1 - cosine_similarity`; zero vectors are treated as orthogonal.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStore for SqliteBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.with_conn(|conn| {
            let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
            Ok(one == 1)
        })
        .await
    }

    async fn get_or_create_collection(
        &self,
        name: &str,
    ) -> Result<CollectionInfo, VectorStoreError> {
        validate_collection_name(name)?;
        let name = name.to_string();
        self.with_conn(move |conn| {
            let created = conn.execute(
                "INSERT OR IGNORE INTO collections (name, dimension, created_at) VALUES (?1, NULL, ?2)",
                params![name, unix_now()],
            )?;
            if created > 0 {
                debug!(collection = %name, "created collection");
            }
            collection_info(conn, &name)?
                .ok_or_else(|| VectorStoreError::CollectionError(format!("{} vanished", name)))
        })
        .await
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>, VectorStoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| collection_info(conn, &name)).await
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VectorStoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.name, c.dimension,
                        (SELECT COUNT(*) FROM embeddings e WHERE e.collection = c.name)
                 FROM collections c ORDER BY c.name",
            )?;
            let rows = stmt.query_map([], |row| {
                let dimension: Option<i64> = row.get(1)?;
                let count: i64 = row.get(2)?;
                Ok(CollectionInfo {
                    name: row.get(0)?,
                    dimension: dimension.map(|d| d as usize),
                    count: count as u64,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, VectorStoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM embeddings WHERE collection = ?1", params![name])?;
            let removed = tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
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
        let collection = collection.to_string();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let stored: Option<Option<i64>> = tx
                .query_row(
                    "SELECT dimension FROM collections WHERE name = ?1",
                    params![collection],
                    |row| row.get(0),
                )
                .optional()?;

            match stored {
                None => return Err(VectorStoreError::CollectionNotFound(collection)),
                Some(Some(expected)) if expected as usize != dimension => {
                    return Err(VectorStoreError::DimensionMismatch {
                        collection,
                        expected: expected as usize,
                        actual: dimension,
                    });
                }
                Some(Some(_)) => {}
                Some(None) => {
                    tx.execute(
                        "UPDATE collections SET dimension = ?1 WHERE name = ?2",
                        params![dimension as i64, collection],
                    )?;
                }
            }

            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO embeddings (collection, id, document, metadata, vector)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for chunk in &chunks {
                    let metadata = serde_json::to_string(&chunk.metadata)?;
                    stmt.execute(params![
                        collection,
                        chunk.id,
                        chunk.content,
                        metadata,
                        encode_vector(&chunk.vector)
                    ])?;
                }
            }

            tx.commit()?;
            debug!(collection = %collection, count = chunks.len(), "added chunks");
            Ok(())
        })
        .await
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        n_results: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        let collection = collection.to_string();
        let query = vector.to_vec();

        self.with_conn(move |conn| {
            let info = collection_info(conn, &collection)?
                .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.clone()))?;

            if let Some(expected) = info.dimension
                && expected != query.len()
            {
                return Err(VectorStoreError::DimensionMismatch {
                    collection,
                    expected,
                    actual: query.len(),
                });
            }
            if n_results == 0 || info.count == 0 {
                return Ok(Vec::new());
            }

            let mut stmt = conn.prepare(
                "SELECT id, document, metadata, vector FROM embeddings WHERE collection = ?1",
            )?;
            let rows = stmt.query_map(params![collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })?;

            let mut scored = Vec::new();
            for row in rows {
                let (id, document, metadata, blob) = row?;
                let distance = cosine_distance(&query, &decode_vector(&blob));
                scored.push((distance, id, document, metadata));
            }
            scored.sort_by(|a, b| a.0.total_cmp(&b.0));
            scored.truncate(n_results);

            scored
                .into_iter()
                .map(|(distance, id, content, metadata)| -> Result<_, VectorStoreError> {
                    let metadata: ChunkMetadata = serde_json::from_str(&metadata)?;
                    Ok(SearchResult {
                        id,
                        content,
                        metadata: Some(metadata),
                        distance,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    fn driver(&self) -> VectorDriver {
        VectorDriver::Sqlite
    }

    fn location(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, idx: u32, text: &str, vector: Vec<f32>) -> DocumentChunk {
        DocumentChunk::new(path, idx, text.to_string(), vector)
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = SqliteBackend::in_memory().unwrap();
        let first = store.get_or_create_collection("docs").await.unwrap();
        let second = store.get_or_create_collection("docs").await.unwrap();

        assert_eq!(first, CollectionInfo::empty("docs"));
        assert_eq!(first, second);
        assert_eq!(store.list_collections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_and_query_by_cosine() {
        let store = SqliteBackend::in_memory().unwrap();
        store.get_or_create_collection("docs").await.unwrap();
        store
            .add(
                "docs",
                vec![
                    chunk("a.txt", 0, "east", vec![1.0, 0.0]),
                    chunk("a.txt", 1, "north", vec![0.0, 1.0]),
                    chunk("a.txt", 2, "north-east", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let results = store.query("docs", &[0.9, 0.1], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "east");
        assert_eq!(results[1].content, "north-east");
        assert_eq!(results[0].id, "a.txt_0");
        assert_eq!(
            results[0].metadata,
            Some(ChunkMetadata {
                file_path: "a.txt".to_string(),
                chunk_index: 0
            })
        );
        assert!(results[0].distance < results[1].distance);

        let info = store.get_collection("docs").await.unwrap().unwrap();
        assert_eq!(info.count, 3);
        assert_eq!(info.dimension, Some(2));
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_replaced() {
        let store = SqliteBackend::in_memory().unwrap();
        store.get_or_create_collection("docs").await.unwrap();
        store
            .add("docs", vec![chunk("a", 0, "old", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .add("docs", vec![chunk("a", 0, "new", vec![1.0, 0.0])])
            .await
            .unwrap();

        let results = store.query("docs", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "new");
    }

    #[tokio::test]
    async fn test_dimension_is_fixed_per_collection() {
        let store = SqliteBackend::in_memory().unwrap();
        store.get_or_create_collection("docs").await.unwrap();
        store
            .add("docs", vec![chunk("a", 0, "x", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let err = store
            .add("docs", vec![chunk("b", 0, "y", vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));

        let err = store.query("docs", &[1.0], 1).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let store = SqliteBackend::in_memory().unwrap();
        assert!(store.get_collection("nope").await.unwrap().is_none());
        assert!(matches!(
            store.query("nope", &[1.0], 3).await,
            Err(VectorStoreError::CollectionNotFound(_))
        ));
        assert!(matches!(
            store.add("nope", vec![chunk("a", 0, "x", vec![1.0])]).await,
            Err(VectorStoreError::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_collection_query() {
        let store = SqliteBackend::in_memory().unwrap();
        store.get_or_create_collection("docs").await.unwrap();
        assert!(store.query("docs", &[1.0, 2.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let store = SqliteBackend::in_memory().unwrap();
        store.get_or_create_collection("docs").await.unwrap();
        store
            .add("docs", vec![chunk("a", 0, "x", vec![1.0])])
            .await
            .unwrap();

        assert!(store.delete_collection("docs").await.unwrap());
        assert!(!store.delete_collection("docs").await.unwrap());
        assert!(store.get_collection("docs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        {
            let store = SqliteBackend::open(&path).unwrap();
            store.get_or_create_collection("docs").await.unwrap();
            store
                .add("docs", vec![chunk("a", 0, "kept", vec![0.5, 0.5])])
                .await
                .unwrap();
        }

        let store = SqliteBackend::open(&path).unwrap();
        let results = store.query("docs", &[0.5, 0.5], 1).await.unwrap();
        assert_eq!(results[0].content, "kept");
        assert_eq!(store.location(), path.display().to_string());
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_vector_blob_encoding() {
        let v = vec![0.25, -1.5, 3.0];
        assert_eq!(decode_vector(&encode_vector(&v)), v);
    }
}
