//! Search-related models for queries and results.

use serde::{Deserialize, Serialize};

use super::document::ChunkMetadata;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// What a similarity search does when any step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryFailurePolicy {
    /// Log the failure and return no results.
    #[default]
    Soft,
    /// Return the failure to the caller.
    Strict,
}

impl QueryFailurePolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            QueryFailurePolicy::Strict
        } else {
            QueryFailurePolicy::Soft
        }
    }
}

/// A similarity search request against one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub embedding_model: String,
    #[serde(default)]
    pub api_key: String,
    pub collection_name: String,
    pub n_results: usize,
}

/// A single nearest-neighbour hit as returned by a vector store backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub metadata: Option<ChunkMetadata>,
    /// Cosine distance (0 = identical direction).
    pub distance: f32,
}

/// Ranked chunk texts for a query, as shown to CLI users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub collection: String,
    pub results: Vec<String>,
    pub duration_ms: u64,
}

impl SearchResults {
    pub fn new(query: String, collection: String, results: Vec<String>, duration_ms: u64) -> Self {
        Self {
            query,
            collection,
            results,
            duration_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("MD".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_failure_policy_from_strict() {
        assert_eq!(
            QueryFailurePolicy::from_strict(true),
            QueryFailurePolicy::Strict
        );
        assert_eq!(
            QueryFailurePolicy::from_strict(false),
            QueryFailurePolicy::Soft
        );
    }

    #[test]
    fn test_failure_policy_serde() {
        let policy: QueryFailurePolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(policy, QueryFailurePolicy::Strict);
    }
}
