use crate::error::BridgeError;
use concord_protocol::ConfirmationRequest;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// A confirmation waiting for the user, with the conversation it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    pub conversation_id: String,
    pub request: ConfirmationRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved,
    /// No entry for the id, or another resolution already holds it
    NotPending,
    BridgeFailed(BridgeError),
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<String, PendingConfirmation>,
    resolving: HashSet<String>,
}

/// Pending confirmations keyed by tool-call id, across all conversations
#[derive(Default)]
pub struct ConfirmationRegistry {
    state: Mutex<RegistryState>,
}

impl ConfirmationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `tool_call_id`
    pub fn upsert(
        &self,
        tool_call_id: impl Into<String>,
        conversation_id: impl Into<String>,
        request: ConfirmationRequest,
    ) {
        self.state.lock().entries.insert(
            tool_call_id.into(),
            PendingConfirmation {
                conversation_id: conversation_id.into(),
                request,
            },
        );
    }

    pub fn get(&self, tool_call_id: &str) -> Option<PendingConfirmation> {
        self.state.lock().entries.get(tool_call_id).cloned()
    }

    /// Request pending for `tool_call_id` within `conversation_id`
    pub fn request_for(&self, conversation_id: &str, tool_call_id: &str) -> Option<ConfirmationRequest> {
        self.state
            .lock()
            .entries
            .get(tool_call_id)
            .filter(|pending| pending.conversation_id == conversation_id)
            .map(|pending| pending.request.clone())
    }

    pub fn contains(&self, tool_call_id: &str) -> bool {
        self.state.lock().entries.contains_key(tool_call_id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.state.lock().entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Claims the entry for resolution.
    ///
    /// Returns `None` when nothing is pending or a resolution is already in
    /// flight, so a concurrent second resolve does nothing.
    pub fn begin_resolution(&self, tool_call_id: &str) -> Option<PendingConfirmation> {
        let mut state = self.state.lock();
        if state.resolving.contains(tool_call_id) {
            return None;
        }
        let pending = state.entries.get(tool_call_id).cloned()?;
        state.resolving.insert(tool_call_id.to_string());
        Some(pending)
    }

    /// Removes the entry once the bridge call has completed
    pub fn finish_resolution(&self, tool_call_id: &str) -> Option<PendingConfirmation> {
        let mut state = self.state.lock();
        state.resolving.remove(tool_call_id);
        state.entries.remove(tool_call_id)
    }

    /// Drops every entry belonging to `conversation_id`
    pub fn drop_conversation(&self, conversation_id: &str) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, pending| pending.conversation_id != conversation_id);
        before - state.entries.len()
    }
}
