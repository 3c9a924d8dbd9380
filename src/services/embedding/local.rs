use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};
use tokio::sync::OnceCell;
use tracing::info;

use super::EmbeddingBackend;
use crate::error::{EmbeddingError, ModelError};
use crate::models::LocalModelConfig;

/// Sentence-transformer ONNX model with mean pooling.
pub struct LocalModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl LocalModel {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path, max_tokens: usize) -> Result<Self, ModelError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.display().to_string()));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Embed a batch, returning L2-normalized mean-pooled vectors.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        let batch_size = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let row = i * seq_len;
            for (j, ((&id, &m), &t)) in encoding
                .get_ids()
                .iter()
                .zip(encoding.get_attention_mask())
                .zip(encoding.get_type_ids())
                .enumerate()
            {
                input_ids[row + j] = id as i64;
                attention_mask[row + j] = m as i64;
                token_type_ids[row + j] = t as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, seq_len], input_ids))
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(([batch_size, seq_len], attention_mask.clone()))
                .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array(([batch_size, seq_len], token_type_ids))
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            ])
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let (shape, hidden) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
        let dims: Vec<i64> = shape.iter().copied().collect();

        if dims.len() != 3 {
            return Err(ModelError::InferenceError(format!(
                "expected [batch, tokens, hidden] output, got {:?}",
                dims
            )));
        }
        let hidden_size = dims[2] as usize;

        Ok(mean_pool(hidden, &attention_mask, batch_size, seq_len, hidden_size)
            .into_iter()
            .map(|v| normalize(&v))
            .collect())
    }
}

/// Average token states weighted by the attention mask.
fn mean_pool(
    hidden: &[f32],
    mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    (0..batch_size)
        .map(|b| {
            let mut pooled = vec![0.0f32; hidden_size];
            let mut count = 0.0f32;
            for t in 0..seq_len {
                if mask[b * seq_len + t] == 0 {
                    continue;
                }
                count += 1.0;
                let offset = (b * seq_len + t) * hidden_size;
                for (d, value) in pooled.iter_mut().enumerate() {
                    *value += hidden[offset + d];
                }
            }
            if count > 0.0 {
                pooled.iter_mut().for_each(|v| *v /= count);
            }
            pooled
        })
        .collect()
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Local model backend, loaded on first use and reused afterwards.
pub struct LocalBackend {
    config: LocalModelConfig,
    model: OnceCell<Arc<LocalModel>>,
}

impl LocalBackend {
    pub fn new(config: LocalModelConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn model(&self) -> Result<Arc<LocalModel>, ModelError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let model_dir = self.config.resolved_model_dir().ok_or_else(|| {
                    ModelError::NotFound(format!(
                        "no model directory for {}",
                        self.config.model_id
                    ))
                })?;
                let max_tokens = self.config.max_tokens as usize;

                info!(model = %self.config.model_id, dir = %model_dir.display(), "loading local embedding model");
                tokio::task::spawn_blocking(move || LocalModel::load(&model_dir, max_tokens))
                    .await
                    .map_err(|e| ModelError::LoadError(e.to_string()))?
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(model))
    }
}

#[async_trait]
impl EmbeddingBackend for LocalBackend {
    async fn embed(
        &self,
        texts: &[String],
        _model: &str,
        _api_key: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let texts = texts.to_vec();
        let embeddings = tokio::task::spawn_blocking(move || model.embed(&texts))
            .await
            .map_err(|e| ModelError::InferenceError(e.to_string()))??;
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_respects_mask() {
        // batch 1, 3 tokens, hidden 2; last token is padding
        let hidden = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
        let mask = [1, 1, 0];
        let pooled = mean_pool(&hidden, &mask, 1, 3, 2);
        assert_eq!(pooled, vec![vec![2.0, 3.0]]);
    }

    #[test]
    fn test_normalize() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_missing_model_is_model_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(LocalModelConfig {
            model_path: Some(dir.path().join("absent")),
            ..Default::default()
        });

        let err = backend
            .embed(&["hello".to_string()], "local-minilm", "")
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Model(ModelError::NotFound(_))));
        assert!(!backend.is_loaded());
    }

    #[tokio::test]
    async fn test_empty_input_does_not_load() {
        let backend = LocalBackend::new(LocalModelConfig::default());
        assert!(backend.embed(&[], "local", "").await.unwrap().is_empty());
        assert!(!backend.is_loaded());
    }
}
