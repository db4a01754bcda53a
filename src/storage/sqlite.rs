//! SQLite Conversation Storage
//!
//! Information Hiding:
//! - Schema and connection handling hidden from users
//! - Blocking database calls run on the blocking pool
//! - Each thread is one row; state is stored as a JSON document

use super::ConversationStore;
use crate::core::state::ConversationState;
use crate::error::StoreError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path`
    pub async fn new(db_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let path = db_path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = Connection::open(&path)?;
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS threads (
                    thread_id TEXT PRIMARY KEY,
                    state TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                "#,
            )?;
            Ok(())
        })
        .await??;

        Ok(Self { db_path })
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let thread_id = thread_id.to_string();
        let json = serde_json::to_string(state)?;
        let count = state.messages.len();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT INTO threads (thread_id, state, updated_at)
                 VALUES (?1, ?2, strftime('%s','now'))
                 ON CONFLICT(thread_id) DO UPDATE SET
                    state = excluded.state,
                    updated_at = excluded.updated_at",
                params![thread_id, json],
            )?;
            tracing::debug!(
                "[SqliteStore] Saved {} messages for thread '{}'",
                count,
                thread_id
            );
            Ok(())
        })
        .await?
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, StoreError> {
        let db_path = self.db_path.clone();
        let thread_id = thread_id.to_string();

        let json = tokio::task::spawn_blocking(move || -> Result<Option<String>, StoreError> {
            let conn = Connection::open(&db_path)?;
            let json = conn
                .query_row(
                    "SELECT state FROM threads WHERE thread_id = ?1",
                    params![thread_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(json)
        })
        .await??;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, thread_id: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let thread_id = thread_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = Connection::open(&db_path)?;
            let removed = conn.execute("DELETE FROM threads WHERE thread_id = ?1", params![thread_id])?;
            tracing::debug!(
                "[SqliteStore] Deleted thread '{}' ({} rows)",
                thread_id,
                removed
            );
            Ok(())
        })
        .await?
    }

    async fn list_threads(&self) -> Result<Vec<String>, StoreError> {
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<String>, StoreError> {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare("SELECT thread_id FROM threads ORDER BY updated_at DESC")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            tracing::debug!("[SqliteStore] Listed {} threads", ids.len());
            Ok(ids)
        })
        .await?
    }
}
