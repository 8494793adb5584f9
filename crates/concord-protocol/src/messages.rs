//! Transcript model: conversations, messages, parts and tool calls

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{RequestId, Sender, ToolCallStatus};

/// One logical chat session and its ordered transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub is_streaming: bool,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), title)
    }

    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            messages: Vec::new(),
            is_streaming: false,
            updated_at: Utc::now(),
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn last_message_mut(&mut self) -> Option<&mut Message> {
        self.messages.last_mut()
    }

    /// Returns the trailing message when it belongs to the assistant,
    /// appending an empty assistant message first otherwise.
    pub fn open_assistant_message(&mut self) -> &mut Message {
        let needs_new = !matches!(self.messages.last(), Some(m) if m.sender == Sender::Assistant);
        if needs_new {
            self.messages.push(Message::assistant(Vec::new()));
        }
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    /// Iterates over every tool call in transcript order
    pub fn tool_calls(&self) -> impl DoubleEndedIterator<Item = &ToolCall> {
        self.messages.iter().flat_map(|m| m.tool_calls())
    }

    pub fn tool_calls_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut ToolCall> {
        self.messages.iter_mut().flat_map(|m| m.tool_calls_mut())
    }

    pub fn find_tool_call(&self, id: &str) -> Option<&ToolCall> {
        self.tool_calls().find(|call| call.id == id)
    }

    pub fn find_tool_call_mut(&mut self, id: &str) -> Option<&mut ToolCall> {
        self.tool_calls_mut().find(|call| call.id == id)
    }

    pub fn has_tool_call(&self, id: &str) -> bool {
        self.find_tool_call(id).is_some()
    }
}

/// A message in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub parts: Vec<Part>,
}

impl Message {
    /// User messages only ever carry text
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, vec![Part::text(text)])
    }

    pub fn assistant(parts: Vec<Part>) -> Self {
        Self::new(Sender::Assistant, parts)
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::assistant(vec![Part::text(text)])
    }

    fn new(sender: Sender, parts: Vec<Part>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            timestamp: Utc::now(),
            parts,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.sender == Sender::Assistant
    }

    pub fn last_part(&self) -> Option<&Part> {
        self.parts.last()
    }

    pub fn last_part_mut(&mut self) -> Option<&mut Part> {
        self.parts.last_mut()
    }

    /// Concatenation of all text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_calls(&self) -> impl DoubleEndedIterator<Item = &ToolCall> {
        self.parts.iter().filter_map(|p| match p {
            Part::ToolCall { tool_call } => Some(tool_call),
            _ => None,
        })
    }

    pub fn tool_calls_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut ToolCall> {
        self.parts.iter_mut().filter_map(|p| match p {
            Part::ToolCall { tool_call } => Some(tool_call),
            _ => None,
        })
    }
}

/// Kind of streamed content that can be accumulated in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaKind {
    Text,
    Thinking,
}

/// One unit of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Part {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call: ToolCall,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn thinking(thinking: impl Into<String>) -> Self {
        Self::Thinking {
            thinking: thinking.into(),
        }
    }

    pub fn tool_call(tool_call: ToolCall) -> Self {
        Self::ToolCall { tool_call }
    }

    pub fn delta(kind: DeltaKind, content: impl Into<String>) -> Self {
        match kind {
            DeltaKind::Text => Self::text(content),
            DeltaKind::Thinking => Self::thinking(content),
        }
    }

    /// Streaming kind of this part; tool calls are not streamed
    pub fn delta_kind(&self) -> Option<DeltaKind> {
        match self {
            Self::Text { .. } => Some(DeltaKind::Text),
            Self::Thinking { .. } => Some(DeltaKind::Thinking),
            Self::ToolCall { .. } => None,
        }
    }

    /// Appends streamed content when the part matches `kind`.
    ///
    /// Returns false and leaves the part untouched otherwise.
    pub fn try_append(&mut self, kind: DeltaKind, content: &str) -> bool {
        match (self, kind) {
            (Self::Text { text }, DeltaKind::Text) => {
                text.push_str(content);
                true
            }
            (Self::Thinking { thinking }, DeltaKind::Thinking) => {
                thinking.push_str(content);
                true
            }
            _ => false,
        }
    }
}

/// A single invoked capability and its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub parameters: Value,
    pub status: ToolCallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_request: Option<ConfirmationRequest>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parameters: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parameters,
            status: ToolCallStatus::Pending,
            label: None,
            icon: None,
            raw_input: None,
            raw_output: None,
            result: None,
            confirmation_request: None,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_raw_input(mut self, raw_input: Option<Value>) -> Self {
        self.raw_input = raw_input;
        self
    }

    /// Applies `next` if it keeps the lifecycle moving forward.
    ///
    /// Returns whether the status changed.
    pub fn advance(&mut self, next: ToolCallStatus) -> bool {
        if self.status == next || !self.status.can_transition_to(&next) {
            return false;
        }
        self.status = next;
        true
    }

    pub fn is_running(&self) -> bool {
        self.status == ToolCallStatus::Running
    }
}

/// What the backend needs to execute a confirmed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl ConfirmationDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameters: Map::new(),
        }
    }

    pub fn is_edit(&self) -> bool {
        self.kind == "edit"
    }
}

/// A pending user-approval gate for a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub request_id: RequestId,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub content: Value,
    pub confirmation: ConfirmationDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_request: Option<Value>,
}

impl ConfirmationRequest {
    /// Tool call this request gates: the explicit id, else the request id
    pub fn target_id(&self) -> String {
        self.tool_call_id
            .clone()
            .unwrap_or_else(|| self.request_id.to_string())
    }
}
