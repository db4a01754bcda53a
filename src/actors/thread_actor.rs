//! Thread Actor - single writer for one conversation thread
//!
//! Information Hiding:
//! - Commands for a thread are processed one at a time, in arrival order
//! - Load, run, commit happens inside the actor; callers only see results
//! - Retirement after idle time is coordinated with the registry lock

use crate::actors::messages::*;
use crate::actors::thread_registry::{lock_threads, ThreadMap};
use crate::core::graph::ConversationGraph;
use crate::core::message::{to_wire, Message};
use crate::core::state::ConversationState;
use crate::error::ServiceError;
use crate::storage::ConversationStore;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout, Duration};

/// Everything a thread actor needs, shared by all actors
pub struct ThreadContext {
    pub graph: ConversationGraph,
    pub store: Option<Arc<dyn ConversationStore>>,
    pub idle_timeout: Duration,
}

pub(crate) async fn thread_actor(
    thread_id: String,
    mut receiver: UnboundedReceiver<ThreadCommand>,
    context: Arc<ThreadContext>,
    threads: ThreadMap,
) {
    tracing::debug!("[Thread {}] Actor started", thread_id);

    loop {
        let command = match timeout(context.idle_timeout, receiver.recv()).await {
            Ok(Some(command)) => command,
            Ok(None) => break,
            Err(_) => {
                // Senders only send while holding the registry lock, so once
                // our entry is gone nothing new can arrive.
                let pending = {
                    let mut map = lock_threads(&threads);
                    match receiver.try_recv() {
                        Ok(command) => Some(command),
                        Err(_) => {
                            map.remove(&thread_id);
                            None
                        }
                    }
                };
                match pending {
                    Some(command) => command,
                    None => break,
                }
            }
        };

        handle_command(&thread_id, command, &context).await;
    }

    tracing::debug!("[Thread {}] Actor retired", thread_id);
}

async fn handle_command(thread_id: &str, command: ThreadCommand, context: &ThreadContext) {
    match command {
        ThreadCommand::Invoke { messages, response } => {
            let result = run_turns(thread_id, messages, context).await;
            if let Err(e) = &result {
                tracing::warn!("[Thread {}] Turn failed: {}", thread_id, e);
            }
            let _ = response.send(result);
        }
        ThreadCommand::Delete { response } => {
            let _ = response.send(delete_thread(thread_id, context).await);
        }
    }
}

/// Run every human message as a turn and commit once at the end.
/// Nothing is saved unless all turns succeed.
async fn run_turns(
    thread_id: &str,
    messages: Vec<Message>,
    context: &ThreadContext,
) -> Result<InvokeResult, ServiceError> {
    let mut state = match &context.store {
        Some(store) => store
            .load(thread_id)
            .await?
            .unwrap_or_else(|| ConversationState::new(thread_id)),
        None => ConversationState::new(thread_id),
    };

    let mut compacted = false;
    for message in messages {
        let outcome = context.graph.submit_turn(&mut state, message).await?;
        compacted |= outcome.compacted;
    }

    if let Some(store) = &context.store {
        store.save(thread_id, &state).await?;
    }

    tracing::info!(
        "[Thread {}] Turn committed ({} messages, compacted: {})",
        thread_id,
        state.messages.len(),
        compacted
    );

    Ok(InvokeResult {
        messages: to_wire(&state.messages),
        state: ThreadSnapshot {
            summary: state.summary_text().to_string(),
            message_count: state.messages.len(),
            compacted,
        },
    })
}

async fn delete_thread(thread_id: &str, context: &ThreadContext) -> Result<(), ServiceError> {
    let store = context.store.as_ref().ok_or(ServiceError::StoreUnavailable)?;
    store.delete(thread_id).await?;
    tracing::info!("[Thread {}] State deleted", thread_id);
    Ok(())
}
