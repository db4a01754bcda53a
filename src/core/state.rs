use super::message::Message;
use serde::{Deserialize, Serialize};

/// Persisted state of one conversation thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub thread_id: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ConversationState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            summary: None,
        }
    }

    /// Summary text, or "" when none has been produced yet
    pub fn summary_text(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    /// Keep only the `count` most recent messages. Returns how many were dropped.
    pub fn retain_recent(&mut self, count: usize) -> usize {
        let keep_from = self.messages.len().saturating_sub(count);
        self.messages.drain(..keep_from).count()
    }
}
