//! Backend event payloads and per-conversation channel names

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ConfirmationDescriptor, ConfirmationRequest, DeltaKind, RequestId};

/// Kind of a per-conversation event channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    Text,
    Thinking,
    ToolCall,
    ToolCallUpdate,
    Error,
    ToolCallConfirmation,
    TurnFinished,
    RawIo,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 8] = [
        ChannelKind::Text,
        ChannelKind::Thinking,
        ChannelKind::ToolCall,
        ChannelKind::ToolCallUpdate,
        ChannelKind::Error,
        ChannelKind::ToolCallConfirmation,
        ChannelKind::TurnFinished,
        ChannelKind::RawIo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Thinking => "thinking",
            Self::ToolCall => "tool-call",
            Self::ToolCallUpdate => "tool-call-update",
            Self::Error => "error",
            Self::ToolCallConfirmation => "tool-call-confirmation",
            Self::TurnFinished => "turn-finished",
            Self::RawIo => "raw-io",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of one event channel: a kind scoped to a conversation.
///
/// Rendered as `<kind>-<conversation_id>`, e.g. `tool-call-update-abc123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelName {
    pub conversation_id: String,
    pub kind: ChannelKind,
}

impl ChannelName {
    pub fn new(conversation_id: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            kind,
        }
    }

    /// All channel names a conversation listens on
    pub fn all_for(conversation_id: &str) -> Vec<ChannelName> {
        ChannelKind::ALL
            .iter()
            .map(|kind| ChannelName::new(conversation_id, *kind))
            .collect()
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.kind, self.conversation_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid channel name: {0}")]
pub struct ChannelNameError(pub String);

impl std::str::FromStr for ChannelName {
    type Err = ChannelNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Longest prefix wins: "tool-call-update-x" must not parse as "tool-call".
        ChannelKind::ALL
            .iter()
            .filter_map(|kind| {
                s.strip_prefix(kind.as_str())
                    .and_then(|rest| rest.strip_prefix('-'))
                    .filter(|id| !id.is_empty())
                    .map(|id| (kind, id))
            })
            .max_by_key(|(kind, _)| kind.as_str().len())
            .map(|(kind, id)| ChannelName::new(id, *kind))
            .ok_or_else(|| ChannelNameError(s.to_string()))
    }
}

/// Streamed text or thinking fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDelta {
    pub delta: String,
}

/// A tool call announced by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallCreated {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "locations")]
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Status change (and possibly result) for an existing tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallUpdated {
    pub tool_call_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl ToolCallUpdated {
    pub fn is_finished(&self) -> bool {
        self.status == crate::FINISHED_STATUS
    }
}

/// Backend-reported failure for the current turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
}

/// Backend asks the user to approve a side-effecting action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequested {
    pub request_id: RequestId,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub content: Value,
    pub confirmation: ConfirmationDescriptor,
}

impl ConfirmationRequested {
    /// Tool call this request gates: the explicit id, else the request id
    pub fn target_id(&self) -> String {
        self.tool_call_id
            .clone()
            .unwrap_or_else(|| self.request_id.to_string())
    }

    pub fn into_request(self, raw_request: Option<Value>) -> ConfirmationRequest {
        ConfirmationRequest {
            request_id: self.request_id,
            session_id: self.session_id,
            tool_call_id: self.tool_call_id,
            label: self.label,
            icon: self.icon,
            content: self.content,
            confirmation: self.confirmation,
            raw_request,
        }
    }
}

/// Direction of a raw protocol line, seen from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawIoDirection {
    /// Received from the backend
    Input,
    /// Sent to the backend
    Output,
}

/// One raw protocol log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIo {
    pub direction: RawIoDirection,
    pub line: String,
}

/// Typed event delivered on a conversation channel
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    TextDelta(ContentDelta),
    ThinkingDelta(ContentDelta),
    ToolCallCreated(ToolCallCreated),
    ToolCallUpdated(ToolCallUpdated),
    Error(ErrorEvent),
    ConfirmationRequested(ConfirmationRequested),
    TurnFinished,
    RawIo(RawIo),
}

impl BackendEvent {
    pub fn text(delta: impl Into<String>) -> Self {
        Self::TextDelta(ContentDelta {
            delta: delta.into(),
        })
    }

    pub fn thinking(delta: impl Into<String>) -> Self {
        Self::ThinkingDelta(ContentDelta {
            delta: delta.into(),
        })
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::TextDelta(_) => ChannelKind::Text,
            Self::ThinkingDelta(_) => ChannelKind::Thinking,
            Self::ToolCallCreated(_) => ChannelKind::ToolCall,
            Self::ToolCallUpdated(_) => ChannelKind::ToolCallUpdate,
            Self::Error(_) => ChannelKind::Error,
            Self::ConfirmationRequested(_) => ChannelKind::ToolCallConfirmation,
            Self::TurnFinished => ChannelKind::TurnFinished,
            Self::RawIo(_) => ChannelKind::RawIo,
        }
    }

    pub fn delta(&self) -> Option<(DeltaKind, &str)> {
        match self {
            Self::TextDelta(d) => Some((DeltaKind::Text, d.delta.as_str())),
            Self::ThinkingDelta(d) => Some((DeltaKind::Thinking, d.delta.as_str())),
            _ => None,
        }
    }

    /// Decodes a raw host-bridge payload received on a channel of `kind`.
    ///
    /// Delta channels accept either a bare string or `{"delta": ".."}`.
    pub fn decode(kind: ChannelKind, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            ChannelKind::Text => Self::TextDelta(decode_delta(payload)?),
            ChannelKind::Thinking => Self::ThinkingDelta(decode_delta(payload)?),
            ChannelKind::ToolCall => Self::ToolCallCreated(serde_json::from_value(payload)?),
            ChannelKind::ToolCallUpdate => Self::ToolCallUpdated(serde_json::from_value(payload)?),
            ChannelKind::Error => Self::Error(serde_json::from_value(payload)?),
            ChannelKind::ToolCallConfirmation => {
                Self::ConfirmationRequested(serde_json::from_value(payload)?)
            }
            ChannelKind::TurnFinished => Self::TurnFinished,
            ChannelKind::RawIo => Self::RawIo(serde_json::from_value(payload)?),
        })
    }
}

fn decode_delta(payload: Value) -> Result<ContentDelta, serde_json::Error> {
    match payload {
        Value::String(delta) => Ok(ContentDelta { delta }),
        other => serde_json::from_value(other),
    }
}
