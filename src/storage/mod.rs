//! Conversation Storage Abstraction
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Allows swapping between memory, filesystem and SQLite without API changes
//! - Each storage implementation encapsulates its own data structures and protocols

use crate::config::{StorageBackend, StorageConfig};
use crate::core::state::ConversationState;
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

pub mod filesystem;
pub mod memory;
pub mod sqlite;

/// Keyed persistence for per-thread conversation state
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Save the full state of a thread, replacing what was there
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), StoreError>;

    /// Load the state of a thread.
    /// Returns `None` if the thread has never been saved
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, StoreError>;

    /// Delete all stored state for a thread. Deleting an unknown thread is not an error
    async fn delete(&self, thread_id: &str) -> Result<(), StoreError>;

    /// List all thread IDs
    async fn list_threads(&self) -> Result<Vec<String>, StoreError>;

    /// Check if a thread exists
    async fn exists(&self, thread_id: &str) -> Result<bool, StoreError> {
        Ok(self.load(thread_id).await?.is_some())
    }
}

/// Build the store selected in configuration.
/// `Disabled` yields `None`: the service then runs without persistence.
pub async fn from_config(
    config: &StorageConfig,
) -> Result<Option<Arc<dyn ConversationStore>>, StoreError> {
    let store: Arc<dyn ConversationStore> = match config.backend {
        StorageBackend::Memory => Arc::new(memory::InMemoryStore::new()),
        StorageBackend::FileSystem => {
            Arc::new(filesystem::FileSystemStore::new(config.path.clone()).await?)
        }
        StorageBackend::Sqlite => Arc::new(sqlite::SqliteStore::new(config.path.clone()).await?),
        StorageBackend::Disabled => {
            tracing::warn!("Conversation store disabled; threads will not be persisted");
            return Ok(None);
        }
    };
    tracing::info!("Using {:?} conversation store", config.backend);
    Ok(Some(store))
}
