//! Placeholder endpoints for the individual workflow stages.

use axum::Json;
use axum::extract::Query;

use super::protocol::{
    LlmResponse, OutputResponse, ProcessedDocsResponse, QueryParam, ReceivedQueryResponse,
};

pub async fn knowledge_base_handler(
    Json(documents): Json<Vec<serde_json::Value>>,
) -> Json<ProcessedDocsResponse> {
    Json(ProcessedDocsResponse {
        processed_docs: documents.len(),
        next_step: "send to LLM Engine".to_string(),
    })
}

pub async fn llm_engine_handler(Query(params): Query<QueryParam>) -> Json<LlmResponse> {
    Json(LlmResponse {
        response: format!("LLM says: Received '{}'", params.query),
    })
}

pub async fn user_query_handler(Query(params): Query<QueryParam>) -> Json<ReceivedQueryResponse> {
    Json(ReceivedQueryResponse {
        received_query: params.query,
        next_step: "send to KnowledgeBase or LLM".to_string(),
    })
}

pub async fn output_handler() -> Json<OutputResponse> {
    Json(OutputResponse {
        output: "This is where the final response will appear".to_string(),
    })
}
