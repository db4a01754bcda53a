//! Completion Oracle Abstraction
//!
//! Information Hiding:
//! - The graph only knows "ordered messages in, one message out"
//! - Provider, transport and retry policy live in the implementations

use super::message::Message;
use crate::error::OracleError;
use async_trait::async_trait;

/// Text-generation capability used by the conversation graph
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    /// Generate the next message for an ordered conversation.
    /// The returned message's role is ignored; the graph stores it as ai.
    async fn generate(&self, messages: &[Message]) -> Result<Message, OracleError>;
}
