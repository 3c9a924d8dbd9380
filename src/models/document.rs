use serde::{Deserialize, Serialize};

/// A source file and the plain text extracted from it.
///
/// `text` is empty when extraction failed; callers check [`Document::is_empty`]
/// rather than expecting an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub file_path: String,
    pub content_type: String,
    pub text: String,
}

impl Document {
    pub fn new(
        file_path: impl Into<String>,
        content_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            content_type: content_type.into(),
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Metadata stored next to every chunk in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub chunk_index: u32,
}

/// One chunk of a document ready to be written to a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,
}

impl DocumentChunk {
    pub fn generate_id(file_path: &str, chunk_index: u32) -> String {
        format!("{}_{}", file_path, chunk_index)
    }

    /// Stable UUID derived from the chunk id, for backends that only accept
    /// UUID or integer point ids.
    pub fn point_uuid(id: &str) -> String {
        use uuid::Uuid;
        Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
    }

    pub fn new(file_path: &str, chunk_index: u32, content: String, vector: Vec<f32>) -> Self {
        Self {
            id: Self::generate_id(file_path, chunk_index),
            content,
            metadata: ChunkMetadata {
                file_path: file_path.to_string(),
                chunk_index,
            },
            vector,
        }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}
