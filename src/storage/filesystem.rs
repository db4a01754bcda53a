//! File System Conversation Storage
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Directory structure management hidden behind interface
//! - Writes go to a temp file and are renamed into place, so a reader never
//!   sees a half-written thread

use super::ConversationStore;
use crate::core::state::ConversationState;
use crate::error::StoreError;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// File system storage - each thread is a JSON file
/// Files are stored as {base_path}/{encoded thread_id}.json
pub struct FileSystemStore {
    base_path: PathBuf,
}

impl FileSystemStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_path).await?;

        Ok(Self { base_path })
    }

    fn thread_path(&self, thread_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", encode_file_stem(thread_id)))
    }
}

/// Thread ids come from URLs; anything outside `[A-Za-z0-9_-]` is written as
/// `%XX` so ids cannot escape the base directory.
fn encode_file_stem(thread_id: &str) -> String {
    let mut out = String::with_capacity(thread_id.len());
    for byte in thread_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_file_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl ConversationStore for FileSystemStore {
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), StoreError> {
        let path = self.thread_path(thread_id);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)?;

        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &path).await?;

        tracing::debug!(
            "[FileSystemStore] Saved {} messages for thread '{}' to {:?}",
            state.messages.len(),
            thread_id,
            path
        );
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, StoreError> {
        let path = self.thread_path(thread_id);

        if !fs::try_exists(&path).await? {
            tracing::debug!("[FileSystemStore] Thread '{}' does not exist", thread_id);
            return Ok(None);
        }

        let json = fs::read_to_string(&path).await?;
        let state: ConversationState = serde_json::from_str(&json)?;

        tracing::debug!(
            "[FileSystemStore] Loaded {} messages for thread '{}' from {:?}",
            state.messages.len(),
            thread_id,
            path
        );
        Ok(Some(state))
    }

    async fn delete(&self, thread_id: &str) -> Result<(), StoreError> {
        let path = self.thread_path(thread_id);

        if fs::try_exists(&path).await? {
            fs::remove_file(&path).await?;
            tracing::debug!("[FileSystemStore] Deleted thread '{}' at {:?}", thread_id, path);
        } else {
            tracing::debug!(
                "[FileSystemStore] Thread '{}' does not exist, nothing to delete",
                thread_id
            );
        }

        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>, StoreError> {
        let mut threads = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(thread_id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(decode_file_stem)
                {
                    threads.push(thread_id);
                }
            }
        }

        tracing::debug!("[FileSystemStore] Listed {} threads", threads.len());
        Ok(threads)
    }

    async fn exists(&self, thread_id: &str) -> Result<bool, StoreError> {
        Ok(fs::try_exists(self.thread_path(thread_id)).await?)
    }
}
