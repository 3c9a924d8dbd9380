use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EmbeddingBackend, check_status, send_error};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::utils::retry::{RetryPolicy, with_retry};

const PROVIDER: &str = "gemini";
const TASK_TYPE: &str = "RETRIEVAL_DOCUMENT";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Client for the Gemini `embedContent` endpoint, one request per text.
///
/// The configured Gemini model is always used; the routing name `gemini` only
/// selects this backend.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl GeminiBackend {
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
            base_url: config.gemini.url.trim_end_matches('/').to_string(),
            model: config.gemini.model.clone(),
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn embed_one(&self, text: &str, api_key: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/{}:embedContent", self.base_url, self.model);
        let request = EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
            task_type: TASK_TYPE,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        let body: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        Ok(body.embedding.values)
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiBackend {
    async fn embed(
        &self,
        texts: &[String],
        _model: &str,
        api_key: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            let vector =
                with_retry(&self.retry, "gemini.embed_content", || self.embed_one(text, api_key))
                    .await?;
            embeddings.push(vector);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> GeminiBackend {
        let mut config = EmbeddingConfig::default();
        config.gemini.url = server.uri();
        GeminiBackend::new(&config)
            .unwrap()
            .with_retry_policy(RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_one_request_per_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/embedding-001:embedContent"))
            .and(query_param("key", "g-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"embedding": {"values": [0.5, 0.25]}})),
            )
            .expect(3)
            .mount(&server)
            .await;

        let texts: Vec<String> = ["one", "two", "three"].iter().map(|s| s.to_string()).collect();
        let vectors = backend(&server).embed(&texts, "gemini", "g-key").await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vec![0.5, 0.25]);

        let requests = server.received_requests().await.unwrap();
        let sent: Vec<String> = requests
            .iter()
            .map(|r| {
                let body: Value = serde_json::from_slice(&r.body).unwrap();
                assert_eq!(body["model"], "models/embedding-001");
                assert_eq!(body["taskType"], "RETRIEVAL_DOCUMENT");
                body["content"]["parts"][0]["text"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(sent, texts);
    }

    #[tokio::test]
    async fn test_error_status_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .embed(&["x".to_string()], "gemini", "bad")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::ServerError {
                provider: "gemini",
                status: 400,
                ..
            }
        ));
    }
}
