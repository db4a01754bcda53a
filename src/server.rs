//! HTTP API routes.

use crate::api::{error_stream, ConversationService, StreamEvent};
use crate::core::message::normalize;
use crate::error::ServiceError;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};

/// Build the application router.
pub fn build_router(service: ConversationService) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/invoke", post(invoke))
        .route("/stream", post(stream))
        .route("/threads/:thread_id/state", get(get_thread_state))
        .route("/threads/:thread_id", delete(delete_thread))
        .with_state(service)
}

/// Serve the router with permissive CORS until the process is stopped.
pub async fn serve(service: ConversationService, addr: SocketAddr) -> anyhow::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(service).layer(cors);

    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Requests ============

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub input: InputPayload,
    #[serde(default)]
    pub config: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct InputPayload {
    pub messages: Vec<Value>,
}

/// Accepts `{"thread_id": ..}` or `{"configurable": {"thread_id": ..}}`
fn thread_id_from_config(config: Option<&Value>) -> Result<String, ServiceError> {
    let config = config.ok_or_else(|| {
        ServiceError::InvalidRequest("config.thread_id is required".to_string())
    })?;

    let raw = config
        .get("thread_id")
        .or_else(|| config.get("configurable").and_then(|c| c.get("thread_id")));

    match raw {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ServiceError::InvalidRequest(
            "config.thread_id is required".to_string(),
        )),
    }
}

// ============ Health Check ============

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "convograph",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============ Conversation ============

async fn invoke(
    State(service): State<ConversationService>,
    Json(request): Json<InvokeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let thread_id = thread_id_from_config(request.config.as_ref())?;
    let result = service.invoke_raw(&thread_id, &request.input.messages).await?;
    Ok(Json(result))
}

async fn stream(
    State(service): State<ConversationService>,
    Json(request): Json<InvokeRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = match thread_id_from_config(request.config.as_ref()) {
        Ok(thread_id) => {
            let messages = request.input.messages.iter().map(normalize).collect();
            service.stream(&thread_id, messages)
        }
        Err(e) => error_stream(e),
    };

    let events = ReceiverStream::new(rx).map(|event: StreamEvent| {
        Event::default().event(event.event_name()).json_data(&event)
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

// ============ Thread State ============

async fn get_thread_state(
    State(service): State<ConversationService>,
    Path(thread_id): Path<String>,
) -> impl IntoResponse {
    Json(service.get_state(&thread_id).await)
}

async fn delete_thread(
    State(service): State<ConversationService>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    service.delete_state(&thread_id).await?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
