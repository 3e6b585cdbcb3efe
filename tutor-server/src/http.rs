//! Tutor HTTP REST API
//!
//! Each endpoint has a thin axum handler that delegates to an inner function
//! returning `(StatusCode, serde_json::Value)`. The inner functions are called
//! directly from unit tests without going through axum dispatch.
//!
//! Endpoints:
//! - POST /chat               : run one chat turn
//! - GET  /health             : store health
//! - GET  /version            : server version info
//! - POST /reviews/:id/rate   : rate a review item (easy | medium | hard)
//! - GET  /reviews/due        : due review items of a session
//! - POST /turns/:id/feedback : +1 / -1 on an assistant turn

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tutor_core::models::Difficulty;
use tutor_core::{LlmBackend, TutorConfig, TutorError, TutorStore};
use uuid::Uuid;

use crate::subsystems::{chat, review};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<dyn TutorStore>,
    pub llm: Arc<dyn LlmBackend>,
    pub config: TutorConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/reviews/due", get(due_handler))
        .route("/reviews/:id/rate", post(rate_handler))
        .route("/turns/:id/feedback", post(feedback_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Tutor HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueQuery {
    pub session_id: Option<String>,
    pub limit: Option<u32>,
}

/// Error body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }

    fn body(self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error,
            "details": self.details,
        })
    }
}

/// Status for a failed review/feedback operation.
pub fn status_for(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<TutorError>() {
        Some(TutorError::NotFound(_)) => StatusCode::NOT_FOUND,
        Some(TutorError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_reply(status: StatusCode, error: &str, details: impl Into<String>) -> (StatusCode, serde_json::Value) {
    (status, ErrorResponse::new(error, details).body())
}

/// Parse a raw request body, replying with `status` when it is not JSON.
fn json_body(raw: &[u8], status: StatusCode) -> std::result::Result<serde_json::Value, (StatusCode, serde_json::Value)> {
    serde_json::from_slice(raw).map_err(|e| error_reply(status, "invalid JSON body", e.to_string()))
}

fn parse_id(raw: &str, what: &str) -> std::result::Result<Uuid, (StatusCode, serde_json::Value)> {
    Uuid::parse_str(raw).map_err(|e| {
        error_reply(
            StatusCode::BAD_REQUEST,
            &format!("invalid {} id", what),
            e.to_string(),
        )
    })
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner chat: every failure, including a malformed body, is a 500.
pub async fn chat_inner(
    store: &dyn TutorStore,
    llm: &dyn LlmBackend,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let start = Instant::now();

    let request: chat::ChatRequest = match serde_json::from_value(payload) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed chat request");
            return error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process chat request",
                e.to_string(),
            );
        }
    };

    match chat::run_chat_turn(store, llm, request).await {
        Ok(response) => {
            tracing::debug!(took_ms = start.elapsed().as_millis() as u64, "POST /chat ok");
            match serde_json::to_value(response) {
                Ok(body) => (StatusCode::OK, body),
                Err(e) => error_reply(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process chat request",
                    e.to_string(),
                ),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Chat turn failed");
            error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process chat request",
                format!("{:#}", e),
            )
        }
    }
}

/// Inner health check: asks the store and returns (status_code, json_body).
pub async fn health_inner(store: &dyn TutorStore) -> (StatusCode, serde_json::Value) {
    match store.health().await {
        Ok(details) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "store": store.name(),
                "details": details,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "store": store.name(),
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "tutor/1",
    })
}

/// Inner rate: body is `{"difficulty": "easy" | "medium" | "hard"}`.
pub async fn rate_inner(
    store: &dyn TutorStore,
    id: &str,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let id = match parse_id(id, "review item") {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let difficulty: Difficulty = match payload.get("difficulty").and_then(|d| d.as_str()) {
        Some(raw) => match raw.parse() {
            Ok(d) => d,
            Err(e) => {
                return error_reply(StatusCode::BAD_REQUEST, "invalid difficulty", format!("{}", e))
            }
        },
        None => {
            return error_reply(
                StatusCode::BAD_REQUEST,
                "invalid difficulty",
                "difficulty field is required",
            )
        }
    };

    match review::rate_review_item(store, id, difficulty, Utc::now()).await {
        Ok(item) => match serde_json::to_value(item) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => error_reply(StatusCode::INTERNAL_SERVER_ERROR, "rating failed", e.to_string()),
        },
        Err(e) => error_reply(status_for(&e), "rating failed", e.to_string()),
    }
}

/// Inner due: `sessionId` is required; `limit` falls back to config.
pub async fn due_inner(
    store: &dyn TutorStore,
    config: &TutorConfig,
    query: DueQuery,
) -> (StatusCode, serde_json::Value) {
    let session_id = match query.session_id {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return error_reply(
                StatusCode::BAD_REQUEST,
                "sessionId is required",
                "missing sessionId query parameter",
            )
        }
    };

    let limit = query.limit.unwrap_or(config.review.due_limit);

    match review::due_review_items(store, &session_id, Utc::now(), limit).await {
        Ok(items) => {
            let count = items.len();
            (
                StatusCode::OK,
                serde_json::json!({
                    "sessionId": session_id,
                    "items": items,
                    "count": count,
                }),
            )
        }
        Err(e) => error_reply(status_for(&e), "due lookup failed", e.to_string()),
    }
}

/// Inner feedback: body is `{"score": 1 | -1}`.
pub async fn feedback_inner(
    store: &dyn TutorStore,
    id: &str,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let id = match parse_id(id, "turn") {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let score = match payload.get("score").and_then(|s| s.as_i64()) {
        Some(s) if s == 1 || s == -1 => s as i16,
        _ => {
            return error_reply(
                StatusCode::BAD_REQUEST,
                "invalid score",
                "score must be 1 or -1",
            )
        }
    };

    match review::record_feedback(store, id, score).await {
        Ok(()) => (
            StatusCode::OK,
            serde_json::json!({ "turnId": id, "score": score }),
        ),
        Err(e) => error_reply(status_for(&e), "feedback failed", e.to_string()),
    }
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn chat_handler(
    State(state): State<Arc<HttpState>>,
    body: Bytes,
) -> impl IntoResponse {
    // Bad JSON gets the same 500 {error, details} reply as any other chat failure.
    let (status, body) = match json_body(&body, StatusCode::INTERNAL_SERVER_ERROR) {
        Ok(payload) => chat_inner(state.store.as_ref(), state.llm.as_ref(), payload).await,
        Err(reply) => reply,
    };
    (status, Json(body))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn rate_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let (status, body) = match json_body(&body, StatusCode::BAD_REQUEST) {
        Ok(payload) => rate_inner(state.store.as_ref(), &id, payload).await,
        Err(reply) => reply,
    };
    (status, Json(body))
}

pub async fn due_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<DueQuery>,
) -> impl IntoResponse {
    let (status, body) = due_inner(state.store.as_ref(), &state.config, query).await;
    (status, Json(body))
}

pub async fn feedback_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let (status, body) = match json_body(&body, StatusCode::BAD_REQUEST) {
        Ok(payload) => feedback_inner(state.store.as_ref(), &id, payload).await,
        Err(reply) => reply,
    };
    (status, Json(body))
}

// ============================================================================
// Unit Tests (inner functions called directly)
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tutor_core::llm::{GenerationRequest, LlmError};
    use tutor_core::models::{AssistantConfig, ChatTurn, Guardrails};
    use tutor_core::InMemoryStore;

    struct EchoLlm;

    #[async_trait]
    impl LlmBackend for EchoLlm {
        async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, LlmError> {
            Ok(format!("Você perguntou: {} [TÓPICO_REVISÃO: Eco]", request.message))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    async fn store_with_assistant() -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let assistant = AssistantConfig::from_parts(
            Uuid::new_v4(),
            "Tutor".into(),
            "Física".into(),
            "friendly".into(),
            String::new(),
            &Guardrails::default(),
            50,
        );
        store.upsert_assistant(&assistant).await.unwrap();
        (store, assistant.id)
    }

    // ========================================================================
    // TEST 1: version_inner is pure and returns correct fields
    // ========================================================================
    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string(), "version must be string");
        assert_eq!(v["protocol"], "tutor/1", "protocol must be tutor/1");
    }

    // ========================================================================
    // TEST 2: status_for maps error kinds
    // ========================================================================
    #[test]
    fn test_status_for_error_kinds() {
        let not_found: anyhow::Error = TutorError::NotFound("x".into()).into();
        let invalid: anyhow::Error = TutorError::InvalidRequest("x".into()).into();
        let other = anyhow::anyhow!("boom");

        assert_eq!(status_for(&not_found), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&invalid), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&other), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ========================================================================
    // TEST 3: chat_inner: missing fields give 500 {error, details}
    // ========================================================================
    #[tokio::test]
    async fn test_chat_inner_malformed_request() {
        let store = InMemoryStore::new();
        let (status, body) = chat_inner(&store, &EchoLlm, serde_json::json!({"message": "oi"})).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
        assert!(body["details"].as_str().unwrap().contains("assistantId"));
    }

    // ========================================================================
    // TEST 4: chat_inner: happy path
    // ========================================================================
    #[tokio::test]
    async fn test_chat_inner_ok() {
        let (store, assistant_id) = store_with_assistant().await;
        let payload = serde_json::json!({
            "message": "O que é força?",
            "assistantId": assistant_id,
            "sessionId": "http-unit",
            "conversationHistory": [],
            "assistantSettings": {}
        });

        let (status, body) = chat_inner(&store, &EchoLlm, payload).await;
        assert_eq!(status, StatusCode::OK, "{:?}", body);
        assert_eq!(body["response"], "Você perguntou: O que é força?");
        assert_eq!(body["extractedTopic"], "Eco");
        assert!(body["turnId"].is_string());
    }

    // ========================================================================
    // TEST 5: health_inner on the in-memory store
    // ========================================================================
    #[tokio::test]
    async fn test_health_inner_in_memory() {
        let store = InMemoryStore::new();
        let (status, body) = health_inner(&store).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["store"], "in_memory");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    // ========================================================================
    // TEST 6: rate_inner: bad id, bad difficulty, unknown item
    // ========================================================================
    #[tokio::test]
    async fn test_rate_inner_errors() {
        let store = InMemoryStore::new();

        let (status, _) = rate_inner(&store, "not-a-uuid", serde_json::json!({"difficulty": "easy"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let id = Uuid::new_v4().to_string();
        let (status, body) = rate_inner(&store, &id, serde_json::json!({"difficulty": "trivial"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid difficulty");

        let (status, body) = rate_inner(&store, &id, serde_json::json!({"difficulty": "easy"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["details"].is_string());
    }

    // ========================================================================
    // TEST 7: due_inner: sessionId required
    // ========================================================================
    #[tokio::test]
    async fn test_due_inner_requires_session() {
        let store = InMemoryStore::new();
        let config = TutorConfig::default();
        let (status, _) = due_inner(&store, &config, DueQuery { session_id: None, limit: None }).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = due_inner(
            &store,
            &config,
            DueQuery {
                session_id: Some("nobody".into()),
                limit: Some(5),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }

    // ========================================================================
    // TEST 8: feedback_inner: score validation and success
    // ========================================================================
    #[tokio::test]
    async fn test_feedback_inner() {
        let store = InMemoryStore::new();
        let turn = ChatTurn::assistant(Uuid::new_v4(), "s", "Resposta");
        store.append_turns(&[turn.clone()]).await.unwrap();
        let id = turn.id.to_string();

        let (status, _) = feedback_inner(&store, &id, serde_json::json!({"score": 0})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = feedback_inner(&store, &id, serde_json::json!({"score": 1})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 1);

        let missing = Uuid::new_v4().to_string();
        let (status, _) = feedback_inner(&store, &missing, serde_json::json!({"score": -1})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
