//! HTTP API for the RAG workflow backend.
//!
//! This module provides the REST endpoints for:
//! - Health and index status
//! - File upload with text preview
//! - Document ingestion and similarity queries
//! - The workflow runner and per-stage placeholders

pub mod error;
pub mod protocol;
mod rag;
mod stages;
mod upload;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::context::AppContext;

pub use error::ApiError;
use protocol::{HealthResponse, StatusResponse};

/// Multipart framing allowance on top of the file size cap.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state
pub struct AppState {
    pub ctx: Arc<AppContext>,
    pub start_time: Instant,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the API router
pub fn router(ctx: Arc<AppContext>) -> Router {
    let max_body = usize::try_from(ctx.config.storage.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let cors = cors_layer(&ctx.config.server.cors_origins);

    let state = Arc::new(AppState {
        ctx,
        start_time: Instant::now(),
    });

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/upload_file", post(upload::upload_file_handler))
        .route("/knowledgebase/upload", post(upload::knowledgebase_upload_handler))
        .route("/ingest", post(rag::ingest_handler))
        .route("/query", post(rag::query_handler))
        .route("/run_workflow", post(rag::run_workflow_handler))
        .route("/knowledge_base", post(stages::knowledge_base_handler))
        .route("/knowledge_base/", post(stages::knowledge_base_handler))
        .route("/llm_engine", post(stages::llm_engine_handler))
        .route("/llm_engine/", post(stages::llm_engine_handler))
        .route("/user_query", post(stages::user_query_handler))
        .route("/user_query/", post(stages::user_query_handler))
        .route("/output", get(stages::output_handler))
        .route("/output/", get(stages::output_handler))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(ctx: Arc<AppContext>, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(%addr, upload_dir = %ctx.config.storage.upload_dir.display(), "listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

// === Health & Status ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store_healthy = state
        .ctx
        .pipeline
        .store()
        .health_check()
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: if store_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        vector_store: store_healthy,
    })
}

async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let store = state.ctx.pipeline.store();
    let collections = store.list_collections().await?;

    Ok(Json(StatusResponse {
        driver: store.driver().to_string(),
        location: store.location(),
        collections,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::test_context;
    use crate::models::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const BOUNDARY: &str = "ragflow-test-boundary";

    struct Harness {
        app: Router,
        upload_dir: tempfile::TempDir,
    }

    fn harness(configure: impl FnOnce(&mut Config)) -> Harness {
        let upload_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.upload_dir = upload_dir.path().to_path_buf();
        configure(&mut config);
        Harness {
            app: router(Arc::new(test_context(config))),
            upload_dir,
        }
    }

    fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(|_| {});
        let (status, body) = send(
            &h.app,
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["vector_store"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_upload_saves_file_and_previews_text() {
        let h = harness(|_| {});
        let text = "word ".repeat(100);
        let (status, body) = send(
            &h.app,
            multipart_request(
                "/upload_file",
                multipart_body("file", "notes.txt", "text/plain", text.as_bytes()),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "notes.txt");
        assert_eq!(body["size"], 500);
        assert_eq!(body["content_type"], "text/plain");
        assert_eq!(body["preview"].as_str().unwrap().chars().count(), 200);

        let stored = std::path::PathBuf::from(body["file_path"].as_str().unwrap());
        assert!(stored.starts_with(h.upload_dir.path()));
        assert_eq!(stored.extension().unwrap(), "txt");
        assert_eq!(std::fs::read_to_string(&stored).unwrap(), text);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_413() {
        let h = harness(|c| c.storage.max_upload_bytes = 16);
        let (status, body) = send(
            &h.app,
            multipart_request(
                "/upload_file",
                multipart_body("file", "big.txt", "text/plain", &[b'x'; 64]),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["code"], "payload_too_large");
        assert_eq!(std::fs::read_dir(h.upload_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let h = harness(|_| {});
        let (status, _) = send(
            &h.app,
            multipart_request(
                "/upload_file",
                multipart_body("other", "a.txt", "text/plain", b"data"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_corrupted_pdf_upload_has_empty_preview() {
        let h = harness(|_| {});
        let (status, body) = send(
            &h.app,
            multipart_request(
                "/upload_file",
                multipart_body("file", "scan.pdf", "application/pdf", b"not a pdf"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["preview"], "");
    }

    #[tokio::test]
    async fn test_legacy_upload_preview() {
        let h = harness(|_| {});
        let text = "x".repeat(800);
        let (status, body) = send(
            &h.app,
            multipart_request(
                "/knowledgebase/upload",
                multipart_body("file", "../evil.txt", "text/plain", text.as_bytes()),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text_preview"].as_str().unwrap().len(), 500);
        assert!(h.upload_dir.path().join("temp_evil.txt").exists());
    }

    #[tokio::test]
    async fn test_ingest_then_query() {
        let h = harness(|_| {});
        let path = h.upload_dir.path().join("guide.txt");
        std::fs::write(&path, "rust ownership borrowing lifetimes traits").unwrap();

        let (status, body) = send(
            &h.app,
            json_request(
                "/ingest",
                json!({
                    "file_path": path.display().to_string(),
                    "embedding_model": "local-minilm",
                    "collection_name": "docs"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["chunks"], 1);
        assert_eq!(body["collection_name"], "docs");

        let (status, body) = send(
            &h.app,
            json_request(
                "/query",
                json!({
                    "query": "borrowing traits",
                    "embedding_model": "local-minilm",
                    "collection_name": "docs",
                    "n_results": 3
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["results"],
            json!(["rust ownership borrowing lifetimes traits"])
        );

        let (status, body) = send(
            &h.app,
            Request::get("/status").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["driver"], "sqlite");
        assert_eq!(body["collections"][0]["name"], "docs");
        assert_eq!(body["collections"][0]["count"], 1);
    }

    #[tokio::test]
    async fn test_ingest_rejects_paths_outside_upload_dir() {
        let h = harness(|_| {});
        let outside = tempfile::NamedTempFile::new().unwrap();

        let (status, _) = send(
            &h.app,
            json_request(
                "/ingest",
                json!({"file_path": outside.path().display().to_string()}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &h.app,
            json_request("/ingest", json!({"file_path": "/no/such/file.txt"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn test_ingest_provider_failure_is_502() {
        let h = harness(|_| {});
        let path = h.upload_dir.path().join("a.txt");
        std::fs::write(&path, "some text").unwrap();

        let (status, body) = send(
            &h.app,
            json_request(
                "/ingest",
                json!({
                    "file_path": path.display().to_string(),
                    "embedding_model": "gemini",
                    "api_key": "bad"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "provider_error");
    }

    #[tokio::test]
    async fn test_query_missing_collection_soft_and_strict() {
        let h = harness(|_| {});
        let (status, body) = send(
            &h.app,
            json_request("/query", json!({"query": "hello", "collection_name": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], json!([]));

        let (status, body) = send(
            &h.app,
            json_request(
                "/query",
                json!({"query": "hello", "collection_name": "nope", "strict": true}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn test_run_workflow_echoes_query() {
        let h = harness(|_| {});
        let (status, body) = send(
            &h.app,
            json_request(
                "/run_workflow",
                json!({
                    "nodes": [{
                        "id": "1",
                        "type": "userQuery",
                        "position": {"x": 0.0, "y": 0.0},
                        "data": {"label": "User Query"}
                    }],
                    "edges": [],
                    "query": "hello"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": "Processed query: hello"}));
    }

    #[tokio::test]
    async fn test_stage_endpoints() {
        let h = harness(|_| {});

        let (_, body) = send(
            &h.app,
            json_request("/knowledge_base/", json!(["a", "b", {"c": 1}])),
        )
        .await;
        assert_eq!(
            body,
            json!({"processed_docs": 3, "next_step": "send to LLM Engine"})
        );

        let (_, body) = send(
            &h.app,
            Request::post("/llm_engine/?query=hi%20there")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(body, json!({"response": "LLM says: Received 'hi there'"}));

        let (_, body) = send(
            &h.app,
            Request::post("/user_query?query=why")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(
            body,
            json!({"received_query": "why", "next_step": "send to KnowledgeBase or LLM"})
        );

        let (_, body) = send(
            &h.app,
            Request::get("/output/").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(
            body,
            json!({"output": "This is where the final response will appear"})
        );
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let h = harness(|_| {});
        let response = h
            .app
            .clone()
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }
}
