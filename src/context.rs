//! Shared application context built once by the entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::models::{Config, SearchQuery};
use crate::services::{EmbeddingService, RetrievalPipeline, create_backend};

/// Configuration plus the retrieval pipeline it describes.
pub struct AppContext {
    pub config: Config,
    pub pipeline: Arc<RetrievalPipeline>,
}

impl AppContext {
    pub fn new(config: Config, pipeline: RetrievalPipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Open the configured vector store and embedding providers.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = create_backend(&config.vector_store)
            .await
            .with_context(|| {
                format!(
                    "failed to open {} vector store at {}",
                    config.vector_store.driver,
                    config.vector_store.location()
                )
            })?;
        let embedding = EmbeddingService::from_config(&config.embedding)
            .context("failed to initialise embedding providers")?;

        info!(
            driver = %config.vector_store.driver,
            location = %config.vector_store.location(),
            "vector store ready"
        );

        let pipeline = RetrievalPipeline::new(embedding, store)
            .with_failure_policy(config.search.failure_policy);
        Ok(Self::new(config, pipeline))
    }

    /// Build a query, filling unset fields from configuration.
    pub fn search_query(
        &self,
        query: String,
        embedding_model: Option<String>,
        api_key: Option<String>,
        collection_name: Option<String>,
        n_results: Option<usize>,
    ) -> SearchQuery {
        SearchQuery {
            query,
            embedding_model: embedding_model
                .unwrap_or_else(|| self.config.embedding.default_model.clone()),
            api_key: api_key.unwrap_or_default(),
            collection_name: collection_name
                .unwrap_or_else(|| self.config.indexing.default_collection.clone()),
            n_results: n_results.unwrap_or(self.config.search.default_limit),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::test_context;
    use super::*;

    #[test]
    fn test_search_query_defaults() {
        let ctx = test_context(Config::default());
        let query = ctx.search_query("hi".to_string(), None, None, None, None);
        assert_eq!(query.embedding_model, "text-embedding-3-large");
        assert_eq!(query.collection_name, "documents");
        assert_eq!(query.n_results, 5);
        assert_eq!(query.api_key, "");

        let query = ctx.search_query(
            "hi".to_string(),
            Some("gemini".to_string()),
            Some("k".to_string()),
            Some("docs".to_string()),
            Some(2),
        );
        assert_eq!(query.embedding_model, "gemini");
        assert_eq!(query.collection_name, "docs");
        assert_eq!(query.n_results, 2);
    }

    #[tokio::test]
    async fn test_from_config_opens_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.vector_store.path = dir.path().join("index.db");

        let ctx = AppContext::from_config(config).await.unwrap();
        assert!(ctx.pipeline.store().health_check().await.unwrap());
    }
}
