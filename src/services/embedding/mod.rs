//! Multi-provider embedding.
//!
//! The model name picks the provider: names starting with `text-embedding` go
//! to the OpenAI embeddings API, the literal `gemini` goes to the Gemini API,
//! and anything else runs through the local ONNX model.

mod gemini;
mod local;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

pub use gemini::GeminiBackend;
pub use local::{LocalBackend, LocalModel};
pub use openai::OpenAiBackend;

/// Provider selected for a model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingProvider {
    OpenAi { model: String },
    Gemini,
    Local,
}

impl EmbeddingProvider {
    pub fn name(&self) -> &'static str {
        match self {
            EmbeddingProvider::OpenAi { .. } => "openai",
            EmbeddingProvider::Gemini => "gemini",
            EmbeddingProvider::Local => "local",
        }
    }
}

/// Route a model name to its provider.
pub fn resolve_provider(model: &str) -> EmbeddingProvider {
    if model.starts_with("text-embedding") {
        EmbeddingProvider::OpenAi {
            model: model.to_string(),
        }
    } else if model == "gemini" {
        EmbeddingProvider::Gemini
    } else {
        EmbeddingProvider::Local
    }
}

/// A source of embedding vectors.
///
/// Implementations return exactly one vector per input text, in input order.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(
        &self,
        texts: &[String],
        model: &str,
        api_key: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Routes embedding requests to the provider chosen by model name.
pub struct EmbeddingService {
    openai: Arc<dyn EmbeddingBackend>,
    gemini: Arc<dyn EmbeddingBackend>,
    local: Arc<dyn EmbeddingBackend>,
    openai_key: Option<String>,
    gemini_key: Option<String>,
}

impl EmbeddingService {
    /// Build the service with the real HTTP and ONNX backends.
    ///
    /// The local model is not loaded until the first local request.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        Ok(Self::with_backends(
            Arc::new(OpenAiBackend::new(config)?),
            Arc::new(GeminiBackend::new(config)?),
            Arc::new(LocalBackend::new(config.local.clone())),
        )
        .with_api_keys(config.openai.api_key.clone(), config.gemini.api_key.clone()))
    }

    pub fn with_backends(
        openai: Arc<dyn EmbeddingBackend>,
        gemini: Arc<dyn EmbeddingBackend>,
        local: Arc<dyn EmbeddingBackend>,
    ) -> Self {
        Self {
            openai,
            gemini,
            local,
            openai_key: None,
            gemini_key: None,
        }
    }

    /// Keys used when a request does not carry its own.
    #[must_use]
    pub fn with_api_keys(mut self, openai: Option<String>, gemini: Option<String>) -> Self {
        self.openai_key = openai.filter(|k| !k.is_empty());
        self.gemini_key = gemini.filter(|k| !k.is_empty());
        self
    }

    /// Embed `texts` with the provider selected by `model`.
    pub async fn embed(
        &self,
        texts: &[String],
        model: &str,
        api_key: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let provider = resolve_provider(model);
        debug!(provider = provider.name(), model, count = texts.len(), "embedding texts");

        let vectors = match &provider {
            EmbeddingProvider::OpenAi { model } => {
                let key = resolve_key(api_key, self.openai_key.as_deref(), "openai")?;
                self.openai.embed(texts, model, key).await?
            }
            EmbeddingProvider::Gemini => {
                let key = resolve_key(api_key, self.gemini_key.as_deref(), "gemini")?;
                self.gemini.embed(texts, model, key).await?
            }
            EmbeddingProvider::Local => self.local.embed(texts, model, api_key).await?,
        };

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "{} returned {} vectors for {} texts",
                provider.name(),
                vectors.len(),
                texts.len()
            )));
        }

        Ok(vectors)
    }

    /// Embed a single query string.
    pub async fn embed_query(
        &self,
        query: &str,
        model: &str,
        api_key: &str,
    ) -> Result<Vec<f32>, EmbeddingError> {
        self.embed(&[query.to_string()], model, api_key)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }
}

/// The caller's key wins; an empty one falls back to the configured key.
fn resolve_key<'a>(
    request_key: &'a str,
    configured: Option<&'a str>,
    provider: &'static str,
) -> Result<&'a str, EmbeddingError> {
    if !request_key.is_empty() {
        return Ok(request_key);
    }
    configured.ok_or(EmbeddingError::MissingApiKey(provider))
}

/// Classify a failed HTTP send.
pub(crate) fn send_error(provider: &'static str, e: reqwest::Error) -> EmbeddingError {
    if e.is_timeout() {
        EmbeddingError::Timeout
    } else if e.is_connect() {
        EmbeddingError::ConnectionError {
            provider,
            message: e.to_string(),
        }
    } else {
        EmbeddingError::RequestError(e)
    }
}

/// Turn a non-success response into a [`EmbeddingError::ServerError`].
pub(crate) async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, EmbeddingError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EmbeddingError::ServerError {
        provider,
        status: status.as_u16(),
        body,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingBackend;
    use super::*;

    struct Fixture {
        openai: Arc<RecordingBackend>,
        gemini: Arc<RecordingBackend>,
        local: Arc<RecordingBackend>,
        service: EmbeddingService,
    }

    fn fixture() -> Fixture {
        let openai = Arc::new(RecordingBackend::default());
        let gemini = Arc::new(RecordingBackend::default());
        let local = Arc::new(RecordingBackend::default());
        let service = EmbeddingService::with_backends(openai.clone(), gemini.clone(), local.clone());
        Fixture {
            openai,
            gemini,
            local,
            service,
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_provider() {
        assert_eq!(
            resolve_provider("text-embedding-3-large"),
            EmbeddingProvider::OpenAi {
                model: "text-embedding-3-large".to_string()
            }
        );
        assert_eq!(resolve_provider("gemini"), EmbeddingProvider::Gemini);
        assert_eq!(resolve_provider("gemini-pro"), EmbeddingProvider::Local);
        assert_eq!(resolve_provider("local-minilm"), EmbeddingProvider::Local);
        assert_eq!(resolve_provider(""), EmbeddingProvider::Local);
    }

    #[tokio::test]
    async fn test_routes_openai_model() {
        let f = fixture();
        let vectors = f
            .service
            .embed(&texts(&["a", "bb"]), "text-embedding-3-large", "sk-test")
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 1.0], vec![2.0, 1.0]]);
        assert_eq!(f.openai.call_count(), 1);
        assert_eq!(f.gemini.call_count(), 0);
        assert_eq!(f.local.call_count(), 0);

        let calls = f.openai.calls.lock().unwrap();
        assert_eq!(calls[0].1, "text-embedding-3-large");
        assert_eq!(calls[0].2, "sk-test");
    }

    #[tokio::test]
    async fn test_routes_gemini_and_local() {
        let f = fixture();
        f.service.embed(&texts(&["x"]), "gemini", "g-key").await.unwrap();
        f.service
            .embed(&texts(&["y"]), "local-minilm", "")
            .await
            .unwrap();

        assert_eq!(f.openai.call_count(), 0);
        assert_eq!(f.gemini.call_count(), 1);
        assert_eq!(f.local.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_skips_providers() {
        let f = fixture();
        let vectors = f.service.embed(&[], "text-embedding-3-small", "").await.unwrap();
        assert!(vectors.is_empty());
        assert_eq!(f.openai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_key_for_remote_provider() {
        let f = fixture();
        let err = f
            .service
            .embed(&texts(&["a"]), "text-embedding-3-large", "")
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::MissingApiKey("openai")));
        assert_eq!(f.openai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_configured_key_fallback() {
        let openai = Arc::new(RecordingBackend::default());
        let service = EmbeddingService::with_backends(
            openai.clone(),
            Arc::new(RecordingBackend::default()),
            Arc::new(RecordingBackend::default()),
        )
        .with_api_keys(Some("from-env".to_string()), None);

        service
            .embed(&texts(&["a"]), "text-embedding-3-large", "")
            .await
            .unwrap();
        service
            .embed(&texts(&["a"]), "text-embedding-3-large", "from-request")
            .await
            .unwrap();

        let calls = openai.calls.lock().unwrap();
        assert_eq!(calls[0].2, "from-env");
        assert_eq!(calls[1].2, "from-request");
    }

    #[tokio::test]
    async fn test_embed_query_returns_single_vector() {
        let f = fixture();
        let vector = f.service.embed_query("abc", "local", "").await.unwrap();
        assert_eq!(vector, vec![3.0, 1.0]);
    }

    #[tokio::test]
    async fn test_provider_error_surfaces() {
        let service = EmbeddingService::with_backends(
            Arc::new(RecordingBackend::failing()),
            Arc::new(RecordingBackend::default()),
            Arc::new(RecordingBackend::default()),
        );
        let err = service
            .embed(&texts(&["a"]), "text-embedding-3-large", "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::ServerError { status: 401, .. }));
    }
}
