//! Integration tests for the HTTP surface
//!
//! These tests drive the router in-process with a scripted model, so no
//! API keys or network access are needed.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use convograph::server::build_router;
use convograph::storage::filesystem::FileSystemStore;
use convograph::storage::memory::InMemoryStore;
use convograph::{
    CompletionOracle, ConversationService, ConversationStore, Message, OracleError, ServiceOptions,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

/// Always answers with the same reply; summary prompts get a summary
struct EchoOracle;

#[async_trait]
impl CompletionOracle for EchoOracle {
    async fn generate(&self, messages: &[Message]) -> Result<Message, OracleError> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        if last.contains("summary of the conversation") {
            Ok(Message::ai("they chatted about jokes"))
        } else {
            Ok(Message::ai("fixed reply"))
        }
    }
}

/// Returns one stored message, same id every time
struct CannedOracle(Message);

#[async_trait]
impl CompletionOracle for CannedOracle {
    async fn generate(&self, _messages: &[Message]) -> Result<Message, OracleError> {
        Ok(self.0.clone())
    }
}

struct DownOracle;

#[async_trait]
impl CompletionOracle for DownOracle {
    async fn generate(&self, _messages: &[Message]) -> Result<Message, OracleError> {
        Err(OracleError::Status {
            status: 401,
            body: "invalid api key".to_string(),
        })
    }
}

fn app_with(oracle: Arc<dyn CompletionOracle>, store: Option<Arc<dyn ConversationStore>>) -> axum::Router {
    build_router(ConversationService::new(oracle, store, ServiceOptions::default()))
}

fn test_app() -> axum::Router {
    app_with(Arc::new(EchoOracle), Some(Arc::new(InMemoryStore::new())))
}

fn turn_body(thread_id: &str, content: &str) -> Body {
    Body::from(
        json!({
            "input": {"messages": [{"type": "human", "content": content}]},
            "config": {"thread_id": thread_id}
        })
        .to_string(),
    )
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post_json(app: &axum::Router, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap(),
    )
    .await
}

async fn get_state(app: &axum::Router, thread_id: &str) -> Value {
    let (status, body) = send(
        app,
        Request::builder()
            .uri(format!("/threads/{}/state", thread_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

/// (event name, data) pairs from an SSE body, skipping keep-alive comments
fn sse_events(body: &[u8]) -> Vec<(String, Value)> {
    let text = String::from_utf8_lossy(body);
    text.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(v) = line.strip_prefix("event:") {
                    event = Some(v.trim().to_string());
                } else if let Some(v) = line.strip_prefix("data:") {
                    data = serde_json::from_str(v.trim()).ok();
                }
            }
            Some((event?, data?))
        })
        .collect()
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_invoke_returns_messages_and_state() {
    let app = test_app();

    let (status, body) = post_json(&app, "/invoke", turn_body("t1", "hi")).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json["messages"],
        json!([
            {"type": "human", "content": "hi"},
            {"type": "ai", "content": "fixed reply"}
        ])
    );
    assert_eq!(json["state"]["message_count"], 2);
    assert_eq!(json["state"]["compacted"], false);
}

#[tokio::test]
async fn test_invoke_accepts_configurable_and_loose_messages() {
    let app = test_app();
    let body = Body::from(
        json!({
            "input": {"messages": ["plain text"]},
            "config": {"configurable": {"thread_id": "t2"}}
        })
        .to_string(),
    );

    let (status, _) = post_json(&app, "/invoke", body).await;
    assert_eq!(status, StatusCode::OK);

    let state = get_state(&app, "t2").await;
    assert_eq!(state["messages"][0], json!({"type": "human", "content": "plain text"}));
}

#[tokio::test]
async fn test_invoke_without_thread_id_is_bad_request() {
    let app = test_app();
    let body = Body::from(json!({"input": {"messages": [{"type": "human", "content": "hi"}]}}).to_string());

    let (status, body) = post_json(&app, "/invoke", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_invoke_oracle_failure_is_bad_gateway() {
    let store: Arc<dyn ConversationStore> = Arc::new(InMemoryStore::new());
    let app = app_with(Arc::new(DownOracle), Some(store.clone()));

    let (status, _) = post_json(&app, "/invoke", turn_body("t1", "hi")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(store.load("t1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_stream_emits_single_message_event() {
    let app = test_app();

    let (status, body) = post_json(&app, "/stream", turn_body("t1", "hi")).await;

    assert_eq!(status, StatusCode::OK);
    let events = sse_events(&body);
    assert_eq!(events.len(), 1);
    let (name, data) = &events[0];
    assert_eq!(name, "message");
    assert_eq!(data["node"], "conversation");
    assert_eq!(data["messages"][1]["content"], "fixed reply");
}

#[tokio::test]
async fn test_stream_emits_error_event_on_failure() {
    let app = app_with(Arc::new(DownOracle), Some(Arc::new(InMemoryStore::new())));

    let (status, body) = post_json(&app, "/stream", turn_body("t1", "hi")).await;

    assert_eq!(status, StatusCode::OK);
    let events = sse_events(&body);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "error");
    assert!(events[0].1["error"].as_str().unwrap().contains("invalid api key"));
}

#[tokio::test]
async fn test_unknown_thread_state_is_empty() {
    let app = test_app();
    let state = get_state(&app, "never-seen").await;
    assert_eq!(state, json!({"messages": [], "summary": ""}));
}

#[tokio::test]
async fn test_seven_turn_conversation_is_summarized() {
    let app = test_app();
    let turns = ["hi", "how are you", "tell me a joke", "another one", "more", "yet another", "final one"];

    for (i, text) in turns.iter().enumerate() {
        let (status, body) = post_json(&app, "/invoke", turn_body("t1", text)).await;
        assert_eq!(status, StatusCode::OK);

        if i == 3 {
            let json: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["state"]["compacted"], true);
            assert!(json["messages"].as_array().unwrap().len() <= 2);
        }
    }

    let state = get_state(&app, "t1").await;
    assert_eq!(state["summary"], "they chatted about jokes");
    let messages = state["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "final one");
}

#[tokio::test]
async fn test_canned_reply_survives_compaction() {
    let app = app_with(
        Arc::new(CannedOracle(Message::ai("fixed reply"))),
        Some(Arc::new(InMemoryStore::new())),
    );

    for text in ["hi", "how are you", "tell me a joke", "another one"] {
        let (status, _) = post_json(&app, "/invoke", turn_body("t1", text)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let state = get_state(&app, "t1").await;
    assert_eq!(
        state["messages"],
        json!([
            {"type": "human", "content": "another one"},
            {"type": "ai", "content": "fixed reply"}
        ])
    );
}

#[tokio::test]
async fn test_delete_then_state_is_empty() {
    let app = test_app();
    post_json(&app, "/invoke", turn_body("t1", "hi")).await;

    let (status, body) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri("/threads/t1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "deleted");
    assert_eq!(get_state(&app, "t1").await, json!({"messages": [], "summary": ""}));
}

#[tokio::test]
async fn test_delete_without_store_is_unavailable() {
    let app = app_with(Arc::new(EchoOracle), None);

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri("/threads/t1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_threads_survive_restart_with_filesystem_store() {
    let dir = tempdir().unwrap();

    {
        let store = FileSystemStore::new(dir.path().to_path_buf()).await.unwrap();
        let app = app_with(Arc::new(EchoOracle), Some(Arc::new(store)));
        post_json(&app, "/invoke", turn_body("durable", "remember me")).await;
    }

    let store = FileSystemStore::new(dir.path().to_path_buf()).await.unwrap();
    let app = app_with(Arc::new(EchoOracle), Some(Arc::new(store)));
    let state = get_state(&app, "durable").await;

    assert_eq!(state["messages"][0]["content"], "remember me");
}
