use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingBackend, check_status, send_error};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::utils::retry::{RetryPolicy, with_retry};

const PROVIDER: &str = "openai";

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for the OpenAI `/embeddings` endpoint.
///
/// Texts are sent in sequential batches; vectors come back in input order.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    batch_size: usize,
    retry: RetryPolicy,
}

impl OpenAiBackend {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.openai.url.trim_end_matches('/').to_string(),
            batch_size: config.openai.batch_size.max(1),
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn embed_batch(
        &self,
        batch: &[String],
        model: &str,
        api_key: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingsRequest {
            model,
            input: batch,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        let mut body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if body.data.len() != batch.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                body.data.len()
            )));
        }

        body.data.sort_by_key(|item| item.index);
        Ok(body.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiBackend {
    async fn embed(
        &self,
        texts: &[String],
        model: &str,
        api_key: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch = i, size = batch.len(), model, "sending OpenAI batch");
            let embeddings = with_retry(&self.retry, "openai.embeddings", || {
                self.embed_batch(batch, model, api_key)
            })
            .await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }
}
