mod config;
mod document;
mod search;
mod workflow;

pub use config::{
    Config, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_MODEL, DEFAULT_GEMINI_MODEL, DEFAULT_HOST,
    DEFAULT_INDEX_PATH, DEFAULT_LOCAL_MODEL, DEFAULT_PORT, DEFAULT_QDRANT_URL, EmbeddingConfig,
    GeminiConfig, IndexingConfig, LocalModelConfig, MAX_UPLOAD_BYTES, OpenAiConfig,
    ResolvedConfig, SearchConfig, ServerConfig, StorageConfig, VectorDriver, VectorStoreConfig,
};
pub use document::{ChunkMetadata, Document, DocumentChunk};
pub use search::{OutputFormat, QueryFailurePolicy, SearchQuery, SearchResult, SearchResults};
pub use workflow::{NodeData, WorkflowEdge, WorkflowNode, WorkflowRequest, WorkflowResponse};
