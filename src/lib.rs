//! Convograph - conversation threads with bounded-history summarization
//!
//! Each thread keeps its messages and an optional running summary. When a
//! turn leaves more messages than the configured threshold, the history is
//! summarized by the model and pruned to the two most recent messages.

pub mod actors;
pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod server;
pub mod storage;
pub mod utils;

pub use api::{ConversationService, InvokeResult, ServiceOptions, StreamEvent, ThreadState};
pub use config::Settings;
pub use crate::core::message::{Message, Role, WireMessage};
pub use crate::core::oracle::CompletionOracle;
pub use error::{OracleError, ServiceError, StoreError};
pub use storage::ConversationStore;
