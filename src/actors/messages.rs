use crate::core::message::{Message, WireMessage};
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Commands accepted by a thread actor. Each carries its own reply channel.
#[derive(Debug)]
pub enum ThreadCommand {
    Invoke {
        messages: Vec<Message>,
        response: oneshot::Sender<Result<InvokeResult, ServiceError>>,
    },
    Delete {
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
}

/// Post-turn view of a thread returned by `invoke`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResult {
    pub messages: Vec<WireMessage>,
    pub state: ThreadSnapshot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub summary: String,
    pub message_count: usize,
    /// Whether this call compacted the history
    pub compacted: bool,
}
