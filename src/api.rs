//! Conversation service facade
//!
//! This module provides the request-facing operations (invoke, stream,
//! get state, delete state) and hides the per-thread actors underneath.

use crate::actors::messages::ThreadCommand;
use crate::actors::thread_actor::ThreadContext;
use crate::actors::ThreadRegistry;
use crate::config::Settings;
use crate::core::graph::{ConversationGraph, DEFAULT_SUMMARY_THRESHOLD};
use crate::core::llm::LLMClient;
use crate::core::message::{to_wire, Message, WireMessage};
use crate::core::oracle::CompletionOracle;
use crate::error::ServiceError;
use crate::storage::{self, ConversationStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub use crate::actors::messages::{InvokeResult, ThreadSnapshot};

/// Node name reported on stream events
pub const STREAM_NODE: &str = "conversation";

/// Stored view of a thread as returned by `get_state`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadState {
    pub messages: Vec<WireMessage>,
    pub summary: String,
}

/// The single terminal event produced by `stream`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Message {
        node: String,
        messages: Vec<WireMessage>,
        state: ThreadSnapshot,
    },
    Error {
        error: String,
    },
}

impl StreamEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::Message { .. } => "message",
            StreamEvent::Error { .. } => "error",
        }
    }

    fn from_result(result: Result<InvokeResult, ServiceError>) -> Self {
        match result {
            Ok(result) => StreamEvent::Message {
                node: STREAM_NODE.to_string(),
                messages: result.messages,
                state: result.state,
            },
            Err(e) => StreamEvent::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Tunables for the service
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub summary_threshold: usize,
    pub thread_idle_timeout: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            summary_threshold: DEFAULT_SUMMARY_THRESHOLD,
            thread_idle_timeout: Duration::from_secs(300),
        }
    }
}

impl ServiceOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            summary_threshold: settings.graph.summary_threshold,
            thread_idle_timeout: Duration::from_millis(settings.system.thread_idle_timeout_ms),
        }
    }
}

/// Request-facing facade over the conversation graph and store
#[derive(Clone)]
pub struct ConversationService {
    registry: ThreadRegistry,
}

impl ConversationService {
    /// Build a service. With `store = None` turns are not persisted,
    /// `get_state` always reports an empty thread and deletes fail.
    pub fn new(
        oracle: Arc<dyn CompletionOracle>,
        store: Option<Arc<dyn ConversationStore>>,
        options: ServiceOptions,
    ) -> Self {
        let context = ThreadContext {
            graph: ConversationGraph::new(oracle, options.summary_threshold),
            store,
            idle_timeout: options.thread_idle_timeout,
        };
        Self {
            registry: ThreadRegistry::new(context),
        }
    }

    /// Wire the service from configuration: LLM client plus configured store
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.api_key()?;
        let oracle = Arc::new(LLMClient::new(api_key, settings.llm.clone()));
        let store = storage::from_config(&settings.storage).await?;
        Ok(Self::new(oracle, store, ServiceOptions::from_settings(settings)))
    }

    fn store(&self) -> Option<&Arc<dyn ConversationStore>> {
        self.registry.context().store.as_ref()
    }

    /// Run one turn per human message, in order, and return the thread's
    /// messages after the last one. All turns commit together or not at all.
    pub async fn invoke(
        &self,
        thread_id: &str,
        messages: Vec<Message>,
    ) -> Result<InvokeResult, ServiceError> {
        validate_thread_id(thread_id)?;
        if messages.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "at least one message is required".to_string(),
            ));
        }

        let (response, rx) = oneshot::channel();
        self.registry
            .dispatch(thread_id, ThreadCommand::Invoke { messages, response })?;

        rx.await
            .map_err(|_| ServiceError::Unavailable(thread_id.to_string()))?
    }

    /// Normalize raw inbound messages and invoke
    pub async fn invoke_raw(
        &self,
        thread_id: &str,
        raw: &[Value],
    ) -> Result<InvokeResult, ServiceError> {
        let messages = raw.iter().map(crate::core::message::normalize).collect();
        self.invoke(thread_id, messages).await
    }

    /// Same work as `invoke`, delivered as exactly one event.
    /// Failures become an `Error` event instead of an `Err`.
    pub fn stream(&self, thread_id: &str, messages: Vec<Message>) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(1);
        let service = self.clone();
        let thread_id = thread_id.to_string();

        tokio::spawn(async move {
            let event = StreamEvent::from_result(service.invoke(&thread_id, messages).await);
            if tx.send(event).await.is_err() {
                tracing::debug!("[Thread {}] Stream receiver dropped", thread_id);
            }
        });

        rx
    }

    /// Stored messages and summary; empty for unknown threads. Never fails.
    pub async fn get_state(&self, thread_id: &str) -> ThreadState {
        let Some(store) = self.store() else {
            return ThreadState::default();
        };

        match store.load(thread_id).await {
            Ok(Some(state)) => ThreadState {
                messages: to_wire(&state.messages),
                summary: state.summary_text().to_string(),
            },
            Ok(None) => ThreadState::default(),
            Err(e) => {
                tracing::warn!("[Thread {}] Failed to load state: {}", thread_id, e);
                ThreadState::default()
            }
        }
    }

    /// Erase everything stored for a thread. Queued behind any in-flight turns.
    pub async fn delete_state(&self, thread_id: &str) -> Result<(), ServiceError> {
        if self.store().is_none() {
            return Err(ServiceError::StoreUnavailable);
        }
        validate_thread_id(thread_id)?;

        let (response, rx) = oneshot::channel();
        self.registry
            .dispatch(thread_id, ThreadCommand::Delete { response })?;

        rx.await
            .map_err(|_| ServiceError::Unavailable(thread_id.to_string()))?
    }

    pub async fn list_threads(&self) -> Result<Vec<String>, ServiceError> {
        let store = self.store().ok_or(ServiceError::StoreUnavailable)?;
        Ok(store.list_threads().await?)
    }

    /// Number of thread actors currently alive
    pub fn active_threads(&self) -> usize {
        self.registry.active_threads()
    }
}

/// Wrap a failure as a one-event stream, for errors caught before `stream` runs
pub fn error_stream(error: ServiceError) -> mpsc::Receiver<StreamEvent> {
    let (tx, rx) = mpsc::channel(1);
    let _ = tx.try_send(StreamEvent::Error {
        error: error.to_string(),
    });
    rx
}

fn validate_thread_id(thread_id: &str) -> Result<(), ServiceError> {
    if thread_id.trim().is_empty() {
        return Err(ServiceError::InvalidRequest(
            "thread_id must not be empty".to_string(),
        ));
    }
    Ok(())
}
