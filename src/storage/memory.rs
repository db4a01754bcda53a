//! In-Memory Conversation Storage
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and ephemeral deployments

use super::ConversationStore;
use crate::core::state::ConversationState;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage using HashMap
/// Data is lost when process terminates
pub struct InMemoryStore {
    threads: Arc<RwLock<HashMap<String, ConversationState>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), StoreError> {
        let mut threads = self.threads.write().await;
        threads.insert(thread_id.to_string(), state.clone());
        tracing::debug!(
            "[InMemoryStore] Saved {} messages for thread '{}'",
            state.messages.len(),
            thread_id
        );
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, StoreError> {
        let threads = self.threads.read().await;
        let state = threads.get(thread_id).cloned();
        tracing::debug!(
            "[InMemoryStore] Loaded thread '{}' (found: {})",
            thread_id,
            state.is_some()
        );
        Ok(state)
    }

    async fn delete(&self, thread_id: &str) -> Result<(), StoreError> {
        let mut threads = self.threads.write().await;
        threads.remove(thread_id);
        tracing::debug!("[InMemoryStore] Deleted thread '{}'", thread_id);
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>, StoreError> {
        let threads = self.threads.read().await;
        let ids: Vec<String> = threads.keys().cloned().collect();
        tracing::debug!("[InMemoryStore] Listed {} threads", ids.len());
        Ok(ids)
    }

    async fn exists(&self, thread_id: &str) -> Result<bool, StoreError> {
        let threads = self.threads.read().await;
        Ok(threads.contains_key(thread_id))
    }
}
