//! Conversation Graph - converse, maybe summarize, end
//!
//! Information Hiding:
//! - Prompt wording for summaries is internal to this module
//! - Turns run on a working copy; the caller's state only changes on success

use super::message::{Message, Role};
use super::oracle::CompletionOracle;
use super::state::ConversationState;
use crate::error::{OracleError, ServiceError};
use std::sync::Arc;

/// Message count above which a turn ends with compaction
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 6;

/// Messages kept verbatim after compaction
pub const RETAINED_MESSAGES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Responding,
    Summarizing,
}

/// Result of one completed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: Message,
    pub compacted: bool,
}

/// Where a thread goes after the model has answered.
/// Strictly greater than: with the default threshold the 7th message compacts.
pub fn route_after_response(message_count: usize, threshold: usize) -> TurnPhase {
    if message_count > threshold {
        TurnPhase::Summarizing
    } else {
        TurnPhase::Idle
    }
}

/// Messages sent to the model for a normal reply
pub fn oracle_input(state: &ConversationState) -> Vec<Message> {
    match state.summary.as_deref().filter(|s| !s.is_empty()) {
        Some(summary) => {
            let mut input = Vec::with_capacity(state.messages.len() + 1);
            input.push(Message::system(format!(
                "Summary of conversation earlier: {}",
                summary
            )));
            input.extend(state.messages.iter().cloned());
            input
        }
        None => state.messages.clone(),
    }
}

pub fn compaction_prompt(summary: Option<&str>) -> String {
    match summary.filter(|s| !s.is_empty()) {
        Some(summary) => format!(
            "This is summary of the conversation to date: {}\n\n\
             Extend the summary by taking into account the new messages above:",
            summary
        ),
        None => "Create a summary of the conversation above:".to_string(),
    }
}

pub struct ConversationGraph {
    oracle: Arc<dyn CompletionOracle>,
    summary_threshold: usize,
}

impl ConversationGraph {
    pub fn new(oracle: Arc<dyn CompletionOracle>, summary_threshold: usize) -> Self {
        Self {
            oracle,
            summary_threshold,
        }
    }

    pub fn summary_threshold(&self) -> usize {
        self.summary_threshold
    }

    /// Run one turn against `state`.
    ///
    /// `state` is left untouched if the turn fails.
    pub async fn submit_turn(
        &self,
        state: &mut ConversationState,
        mut human: Message,
    ) -> Result<TurnOutcome, ServiceError> {
        if human.role != Role::Human {
            return Err(ServiceError::InvalidRequest(format!(
                "turn must start with a human message, got '{}'",
                human.role.as_str()
            )));
        }

        let mut working = state.clone();
        let mut phase = TurnPhase::Idle;
        self.transition(&working, &mut phase, TurnPhase::Responding);

        // ids stay unique within a thread even if the caller reuses one
        if working.messages.iter().any(|m| m.id == human.id) {
            human = Message::human(human.content);
        }
        working.messages.push(human);
        let reply = self.respond(&working).await?;
        working.messages.push(reply.clone());

        let next = route_after_response(working.messages.len(), self.summary_threshold);
        self.transition(&working, &mut phase, next);

        let compacted = phase == TurnPhase::Summarizing;
        if compacted {
            self.summarize(&mut working).await?;
            self.transition(&working, &mut phase, TurnPhase::Idle);
        }

        *state = working;
        Ok(TurnOutcome { reply, compacted })
    }

    async fn respond(&self, state: &ConversationState) -> Result<Message, OracleError> {
        let generated = self.oracle.generate(&oracle_input(state)).await?;
        Ok(Message::ai(generated.content))
    }

    /// Replace the summary and prune everything but the most recent messages.
    async fn summarize(&self, state: &mut ConversationState) -> Result<(), OracleError> {
        let mut input = state.messages.clone();
        input.push(Message::human(compaction_prompt(state.summary.as_deref())));

        let generated = self.oracle.generate(&input).await?;

        state.summary = Some(generated.content);
        let removed = state.retain_recent(RETAINED_MESSAGES);

        tracing::info!(
            "[Thread {}] Compacted {} messages into summary",
            state.thread_id,
            removed
        );
        Ok(())
    }

    fn transition(&self, state: &ConversationState, phase: &mut TurnPhase, next: TurnPhase) {
        tracing::debug!(
            "[Thread {}] {:?} -> {:?} ({} messages)",
            state.thread_id,
            phase,
            next,
            state.messages.len()
        );
        *phase = next;
    }
}
