use concord_protocol::{RawIo, RawIoDirection};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Latest decoded backend payload per conversation.
///
/// Tool calls and confirmations keep it as the raw protocol evidence they
/// were built from.
#[derive(Default)]
pub struct RawIoTracker {
    latest_input: Mutex<HashMap<String, Value>>,
}

impl RawIoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an inbound line. Outbound and malformed lines are skipped.
    ///
    /// Returns whether the line was recorded.
    pub fn observe(&self, conversation_id: &str, raw: &RawIo) -> bool {
        if raw.direction != RawIoDirection::Input {
            return false;
        }

        match serde_json::from_str::<Value>(&raw.line) {
            Ok(value) => {
                self.latest_input
                    .lock()
                    .insert(conversation_id.to_string(), value);
                true
            }
            Err(e) => {
                tracing::trace!("Ignoring malformed raw line on {}: {}", conversation_id, e);
                false
            }
        }
    }

    pub fn latest_input(&self, conversation_id: &str) -> Option<Value> {
        self.latest_input.lock().get(conversation_id).cloned()
    }

    pub fn forget(&self, conversation_id: &str) {
        self.latest_input.lock().remove(conversation_id);
    }
}
