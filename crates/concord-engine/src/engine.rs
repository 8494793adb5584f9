use crate::accumulator;
use crate::bridge::CommandBridge;
use crate::confirmation::{ConfirmationRegistry, ResolveOutcome};
use crate::coordinator::UpdateCoordinator;
use crate::error::EngineError;
use crate::raw_io::RawIoTracker;
use crate::store::{ConversationStore, InMemoryConversationStore};
use crate::tool_calls::{ToolCallMachine, UpdateOutcome};
use concord_config::EngineConfig;
use concord_protocol::{
    BackendEvent, ConfirmationOutcome, ConfirmationResponse, Conversation, DeltaKind, HistoryEntry,
    Message, Part, SendMessage, ToolCallStatus,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;

pub const REJECTED_RESULT: &str = "Tool call rejected by user";

/// Single writer that reconciles backend events into conversation transcripts
pub struct ReconciliationEngine {
    coordinator: UpdateCoordinator,
    confirmations: ConfirmationRegistry,
    raw_io: RawIoTracker,
    tool_calls: ToolCallMachine,
    bridge: Arc<dyn CommandBridge>,
    history_window: usize,
    channel_capacity: usize,
}

impl ReconciliationEngine {
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn ConversationStore>,
        bridge: Arc<dyn CommandBridge>,
    ) -> Self {
        Self {
            coordinator: UpdateCoordinator::new(store),
            confirmations: ConfirmationRegistry::new(),
            raw_io: RawIoTracker::new(),
            tool_calls: ToolCallMachine::from_config(config),
            bridge,
            history_window: config.history_window,
            channel_capacity: config.channel_capacity,
        }
    }

    /// Default configuration over an in-memory store
    pub fn with_bridge(bridge: Arc<dyn CommandBridge>) -> Self {
        Self::new(
            &EngineConfig::default(),
            Arc::new(InMemoryConversationStore::new()),
            bridge,
        )
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn conversation(&self, id: &str) -> Option<Arc<Conversation>> {
        self.coordinator.snapshot(id)
    }

    pub fn conversations(&self) -> Vec<Arc<Conversation>> {
        self.coordinator.list()
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<Arc<Conversation>> {
        self.coordinator.subscribe()
    }

    pub fn confirmations(&self) -> &ConfirmationRegistry {
        &self.confirmations
    }

    pub fn coordinator(&self) -> &UpdateCoordinator {
        &self.coordinator
    }

    pub fn create_conversation(&self, title: impl Into<String>) -> Arc<Conversation> {
        self.coordinator.insert(Conversation::new(title))
    }

    /// Registers a conversation whose id was assigned elsewhere.
    ///
    /// An existing conversation with the same id is kept as is.
    pub fn open_conversation(&self, id: &str, title: impl Into<String>) -> Arc<Conversation> {
        match self.coordinator.snapshot(id) {
            Some(existing) => existing,
            None => self.coordinator.insert(Conversation::with_id(id, title)),
        }
    }

    pub async fn start_session(&self, conversation_id: &str) -> Result<(), EngineError> {
        if self.coordinator.snapshot(conversation_id).is_none() {
            return Err(EngineError::ConversationNotFound(conversation_id.to_string()));
        }

        if let Err(e) = self.bridge.start_session(conversation_id).await {
            tracing::warn!("Failed to start session for {}: {}", conversation_id, e);
            self.report_error(conversation_id, &e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    /// Stops the backend process and forgets the conversation along with
    /// its pending confirmations.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Option<Arc<Conversation>> {
        if let Err(e) = self.bridge.kill_process(conversation_id).await {
            tracing::warn!("Failed to stop backend for {}: {}", conversation_id, e);
        }

        let dropped = self.confirmations.drop_conversation(conversation_id);
        if dropped > 0 {
            tracing::debug!(
                "Dropped {} pending confirmations for {}",
                dropped,
                conversation_id
            );
        }
        self.raw_io.forget(conversation_id);
        self.coordinator.remove(conversation_id)
    }

    /// Applies one backend event to conversation `conversation_id`
    pub fn apply(&self, conversation_id: &str, event: BackendEvent) -> Result<(), EngineError> {
        match event {
            BackendEvent::TextDelta(delta) => {
                self.coordinator.update_conversation(conversation_id, |tx| {
                    accumulator::apply_delta(tx, DeltaKind::Text, &delta.delta)
                })
            }
            BackendEvent::ThinkingDelta(delta) => {
                self.coordinator.update_conversation(conversation_id, |tx| {
                    accumulator::apply_delta(tx, DeltaKind::Thinking, &delta.delta)
                })
            }
            BackendEvent::ToolCallCreated(created) => {
                let raw_input = self.raw_io.latest_input(conversation_id);
                let pending = self.confirmations.request_for(conversation_id, &created.id);
                let added = self.coordinator.update_conversation(conversation_id, |tx| {
                    self.tool_calls.create(tx, created, raw_input, pending)
                })?;
                if added {
                    tracing::trace!("Tool call added to {}", conversation_id);
                }
                Ok(())
            }
            BackendEvent::ToolCallUpdated(update) => {
                let raw_output = self.raw_io.latest_input(conversation_id);
                let outcome = self.coordinator.update_conversation(conversation_id, |tx| {
                    self.tool_calls.update(tx, &update, raw_output)
                })?;
                match outcome {
                    UpdateOutcome::Applied {
                        tool_call_id,
                        fallback,
                        swept,
                    } => tracing::debug!(
                        tool_call_id = %tool_call_id,
                        status = %update.status,
                        fallback,
                        swept,
                        "Tool call updated"
                    ),
                    UpdateOutcome::Ignored { tool_call_id } => tracing::debug!(
                        "Ignoring {} update for {}, status cannot move back",
                        update.status,
                        tool_call_id
                    ),
                    UpdateOutcome::Unmatched => tracing::debug!(
                        "No tool call {} in {} for {} update",
                        update.tool_call_id,
                        conversation_id,
                        update.status
                    ),
                }
                Ok(())
            }
            BackendEvent::Error(error) => {
                self.report_error_checked(conversation_id, &error.message)
            }
            BackendEvent::ConfirmationRequested(requested) => {
                let raw_request = self.raw_io.latest_input(conversation_id);
                let request = requested.into_request(raw_request);
                let target = request.target_id();
                let synthesized = self
                    .coordinator
                    .update_conversation(conversation_id, |tx| self.tool_calls.confirm(tx, &request))?;
                if synthesized {
                    tracing::debug!("Synthesized edit tool call {} from confirmation", target);
                }
                self.confirmations.upsert(target, conversation_id, request);
                Ok(())
            }
            BackendEvent::TurnFinished => self
                .coordinator
                .update_conversation(conversation_id, |tx| tx.is_streaming = false),
            BackendEvent::RawIo(raw) => {
                self.raw_io.observe(conversation_id, &raw);
                Ok(())
            }
        }
    }

    /// Sends the user's decision for a pending confirmation and applies it
    /// to the tool call.
    ///
    /// The registry entry is removed once the bridge call returns, whether
    /// it succeeded or not.
    pub async fn resolve(&self, tool_call_id: &str, outcome: ConfirmationOutcome) -> ResolveOutcome {
        let Some(pending) = self.confirmations.begin_resolution(tool_call_id) else {
            tracing::debug!("No pending confirmation for {}", tool_call_id);
            return ResolveOutcome::NotPending;
        };

        let response = ConfirmationResponse {
            session_id: pending.request.session_id.clone(),
            request_id: pending.request.request_id.clone(),
            tool_call_id: tool_call_id.to_string(),
            outcome,
        };
        let sent = self.bridge.send_confirmation(response).await;
        self.confirmations.finish_resolution(tool_call_id);

        let conversation_id = pending.conversation_id.as_str();
        if let Err(e) = sent {
            tracing::warn!("Failed to send confirmation for {}: {}", tool_call_id, e);
            self.report_error(conversation_id, &e.to_string());
            return ResolveOutcome::BridgeFailed(e);
        }

        let applied = self.coordinator.update_conversation(conversation_id, |tx| {
            let Some(call) = tx.find_tool_call_mut(tool_call_id) else {
                return false;
            };
            if outcome.is_allow() {
                call.advance(ToolCallStatus::Running)
            } else if outcome.is_reject() {
                let changed = call.advance(ToolCallStatus::Failed);
                if changed {
                    call.result = Some(json!({ "markdown": REJECTED_RESULT }));
                }
                changed
            } else {
                false
            }
        });

        match applied {
            Ok(changed) => tracing::debug!(
                "Resolved {} with {} (status changed: {})",
                tool_call_id,
                outcome,
                changed
            ),
            Err(e) => tracing::warn!("Resolved {} but could not update transcript: {}", tool_call_id, e),
        }

        ResolveOutcome::Resolved
    }

    /// Appends a user message and forwards it with recent history
    pub async fn send_user_message(
        &self,
        conversation_id: &str,
        text: impl Into<String>,
    ) -> Result<(), EngineError> {
        let text = text.into();
        let window = self.history_window;

        let history = self.coordinator.update_conversation(conversation_id, |tx| {
            let history = roll_up_history(&tx.messages, window);
            tx.messages.push(Message::user(text.clone()));
            tx.is_streaming = true;
            history
        })?;

        let message = SendMessage {
            conversation_id: conversation_id.to_string(),
            text,
            history,
        };

        if let Err(e) = self.bridge.send_message(message).await {
            tracing::warn!("Failed to send message to {}: {}", conversation_id, e);
            self.report_error(conversation_id, &e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    fn report_error_checked(&self, conversation_id: &str, message: &str) -> Result<(), EngineError> {
        self.coordinator.update_conversation(conversation_id, |tx| {
            tx.messages
                .push(Message::assistant_text(format!("Error: {}", message)));
            tx.is_streaming = false;
        })
    }

    fn report_error(&self, conversation_id: &str, message: &str) {
        if let Err(e) = self.report_error_checked(conversation_id, message) {
            tracing::warn!("Could not record error in {}: {}", conversation_id, e);
        }
    }
}

/// Flattens the last `window` messages into plain-text history entries
fn roll_up_history(messages: &[Message], window: usize) -> Vec<HistoryEntry> {
    let start = messages.len().saturating_sub(window);
    messages[start..]
        .iter()
        .filter_map(|message| {
            let content = message
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text { text } if !text.is_empty() => Some(text.clone()),
                    Part::Thinking { thinking } if !thinking.is_empty() => {
                        Some(format!("[thinking] {}", thinking))
                    }
                    Part::ToolCall { tool_call } => Some(format!(
                        "[tool {} {}]",
                        tool_call.name, tool_call.status
                    )),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");

            (!content.is_empty()).then(|| HistoryEntry {
                sender: message.sender,
                content,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_protocol::{Sender, ToolCall};

    #[test]
    fn test_roll_up_history_window() {
        let mut messages = vec![
            Message::user("one"),
            Message::assistant(vec![
                Part::thinking("plan"),
                Part::text("two"),
                Part::tool_call(ToolCall::new("1", "bash", json!({}))),
            ]),
            Message::user("three"),
        ];
        messages.push(Message::assistant(vec![Part::text("")]));

        let history = roll_up_history(&messages, 3);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, Sender::Assistant);
        assert_eq!(history[0].content, "[thinking] plan\ntwo\n[tool bash pending]");
        assert_eq!(history[1].content, "three");

        assert!(roll_up_history(&messages, 0).is_empty());
    }
}
