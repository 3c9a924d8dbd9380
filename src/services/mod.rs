mod chunker;
mod embedding;
mod extractor;
mod pipeline;
mod vector_store;

pub use chunker::{TextChunker, chunk_text};
pub use embedding::{
    EmbeddingBackend, EmbeddingProvider, EmbeddingService, GeminiBackend, LocalBackend,
    LocalModel, OpenAiBackend, resolve_provider,
};
pub use extractor::{DocumentKind, DocumentProcessor, guess_content_type};
pub use pipeline::{IngestReport, RetrievalPipeline, StoreRequest};
pub use vector_store::{
    CollectionInfo, QdrantBackend, SqliteBackend, VectorStore, create_backend,
    validate_collection_name,
};

#[cfg(test)]
pub(crate) use embedding::testing;
