//! Common types used across the Concord protocol

use serde::{Deserialize, Serialize};

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Status value reported on tool-call updates that triggers result classification
pub const FINISHED_STATUS: &str = "finished";

/// Lifecycle status of a tool call.
///
/// Statuses the backend sends that are not part of the known lifecycle are
/// carried verbatim in [`ToolCallStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolCallStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Other(String),
}

impl ToolCallStatus {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(status) => status,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running | Self::Other(_) => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle moving forward.
    ///
    /// Terminal statuses are never left, and a status never falls back to an
    /// earlier stage.
    pub fn can_transition_to(&self, next: &ToolCallStatus) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl From<String> for ToolCallStatus {
    fn from(status: String) -> Self {
        Self::from_wire(&status)
    }
}

impl From<ToolCallStatus> for String {
    fn from(status: ToolCallStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for ToolCallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a confirmation request as sent by the backend.
///
/// The backend uses numeric ids, but string ids are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}
