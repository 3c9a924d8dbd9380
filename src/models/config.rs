use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::search::QueryFailurePolicy;
use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_INDEX_PATH: &str = "vector_db/ragflow.db";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "documents";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "models/embedding-001";
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

const PROJECT_CONFIG_FILE: &str = "ragflow.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

/// Configuration together with the file it was read from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ragflow").join("config.toml"))
    }

    pub fn project_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    pub fn models_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("ragflow").join("models"))
    }

    /// Load configuration from `explicit`, then `./ragflow.toml`, then the
    /// global config file, falling back to defaults. Environment overrides are
    /// applied last.
    pub fn load(explicit: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
        let candidate = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::PathError(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => [Some(Self::project_path()), Self::global_path()]
                .into_iter()
                .flatten()
                .find(|p| p.exists()),
        };

        let mut config = match &candidate {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(ResolvedConfig {
            config,
            path: candidate,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(host) = env_var("RAGFLOW_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_var("RAGFLOW_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(dir) = env_var("RAGFLOW_UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(dir);
        }
        if let Some(path) = env_var("RAGFLOW_INDEX_PATH") {
            self.vector_store.path = PathBuf::from(path);
        }
        if let Some(key) = env_var("OPENAI_API_KEY") {
            self.embedding.openai.api_key = Some(key);
        }
        if let Some(key) = env_var("GEMINI_API_KEY") {
            self.embedding.gemini.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexing.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "indexing.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "indexing.chunk_overlap ({}) must be smaller than indexing.chunk_size ({})",
                self.indexing.chunk_overlap, self.indexing.chunk_size
            )));
        }
        if self.embedding.openai.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.openai.batch_size must be at least 1".to_string(),
            ));
        }
        if self.search.default_limit == 0 {
            return Err(ConfigError::ValidationError(
                "search.default_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UPLOAD_DIR)
}

fn default_max_upload_bytes() -> u64 {
    MAX_UPLOAD_BYTES
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model used when a request does not name one.
    #[serde(default = "default_embedding_model")]
    pub default_model: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub local: LocalModelConfig,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            default_model: default_embedding_model(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            local: LocalModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_url")]
    pub url: String,

    #[serde(default = "default_openai_batch_size")]
    pub batch_size: usize,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_openai_url() -> String {
    DEFAULT_OPENAI_URL.to_string()
}

fn default_openai_batch_size() -> usize {
    50
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            url: default_openai_url(),
            batch_size: default_openai_batch_size(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_url")]
    pub url: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_gemini_url() -> String {
    DEFAULT_GEMINI_URL.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            url: default_gemini_url(),
            model: default_gemini_model(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalModelConfig {
    #[serde(default = "default_local_model")]
    pub model_id: String,

    /// Directory holding `model.onnx` and `tokenizer.json`. Defaults to
    /// `<data_dir>/ragflow/models/<model_id>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_local_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    256
}

impl LocalModelConfig {
    pub fn resolved_model_dir(&self) -> Option<PathBuf> {
        self.model_path.clone().or_else(|| {
            Config::models_dir().map(|dir| dir.join(self.model_id.replace('/', "--")))
        })
    }
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            model_id: default_local_model(),
            model_path: None,
            max_tokens: default_max_tokens(),
        }
    }
}

/// Vector database driver type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    /// Embedded SQLite file with exact cosine search
    #[default]
    Sqlite,
    /// Remote Qdrant server
    Qdrant,
}

impl std::fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorDriver::Sqlite => write!(f, "sqlite"),
            VectorDriver::Qdrant => write!(f, "qdrant"),
        }
    }
}

impl std::str::FromStr for VectorDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(VectorDriver::Sqlite),
            "qdrant" => Ok(VectorDriver::Qdrant),
            _ => Err(format!("unknown vector driver: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    /// SQLite database file (sqlite driver).
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    /// Server URL (qdrant driver).
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_index_path() -> PathBuf {
    PathBuf::from(DEFAULT_INDEX_PATH)
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

impl VectorStoreConfig {
    /// Human-readable location of the index for status output.
    pub fn location(&self) -> String {
        match self.driver {
            VectorDriver::Sqlite => self.path.display().to_string(),
            VectorDriver::Qdrant => self.url.clone(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            path: default_index_path(),
            url: default_qdrant_url(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default = "default_collection")]
    pub default_collection: String,

    /// Window size in words.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words shared between consecutive windows.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/.venv/**".to_string(),
        "**/__pycache__/**".to_string(),
    ]
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            default_collection: default_collection(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default)]
    pub failure_policy: QueryFailurePolicy,
}

fn default_limit() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            failure_policy: QueryFailurePolicy::default(),
        }
    }
}
