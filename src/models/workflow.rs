//! Workflow graph as sent by the visual editor.
//!
//! Field names follow the editor's JSON, which mixes camelCase and snake_case.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, rename = "queryText")]
    pub query_text: Option<String>,
    #[serde(default)]
    pub points: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default = "default_embedding_model", rename = "embeddingModel")]
    pub embedding_model: Option<String>,
    #[serde(default = "default_uploaded_files", rename = "uploadedFiles")]
    pub uploaded_files: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: Option<usize>,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: Option<usize>,
    #[serde(default, rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_model", rename = "llmModel")]
    pub llm_model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_web_search_tool", rename = "webSearchTool")]
    pub web_search_tool: Option<String>,
    #[serde(default = "default_max_tokens", rename = "maxTokens")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_top_p", rename = "topP")]
    pub top_p: Option<f64>,
    #[serde(default = "default_penalty", rename = "frequencyPenalty")]
    pub frequency_penalty: Option<f64>,
    #[serde(default = "default_penalty", rename = "presencePenalty")]
    pub presence_penalty: Option<f64>,
    #[serde(default, rename = "outputText")]
    pub output_text: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_allow_follow_up", rename = "allowFollowUp")]
    pub allow_follow_up: Option<bool>,
}

fn default_embedding_model() -> Option<String> {
    Some(crate::models::DEFAULT_EMBEDDING_MODEL.to_string())
}

fn default_uploaded_files() -> Option<Vec<serde_json::Value>> {
    Some(Vec::new())
}

fn default_chunk_size() -> Option<usize> {
    Some(1000)
}

fn default_chunk_overlap() -> Option<usize> {
    Some(200)
}

fn default_llm_model() -> Option<String> {
    Some("gpt-4o-mini".to_string())
}

fn default_temperature() -> Option<f64> {
    Some(0.7)
}

fn default_web_search_tool() -> Option<String> {
    Some("SerpAPI".to_string())
}

fn default_max_tokens() -> Option<u32> {
    Some(1000)
}

fn default_top_p() -> Option<f64> {
    Some(1.0)
}

fn default_penalty() -> Option<f64> {
    Some(0.0)
}

fn default_allow_follow_up() -> Option<bool> {
    Some(false)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: HashMap<String, f64>,
    pub data: NodeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub result: String,
}

impl WorkflowRequest {
    /// Run the workflow.
    ///
    /// Node wiring is not executed yet; the query is echoed back.
    pub fn run(&self) -> WorkflowResponse {
        WorkflowResponse {
            result: format!("Processed query: {}", self.query),
        }
    }
}
