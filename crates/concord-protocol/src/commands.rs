//! Outbound commands sent to the backend through the host bridge

use serde::{Deserialize, Serialize};

use crate::{RequestId, Sender};

/// User's decision on a confirmation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationOutcome {
    Allow,
    AlwaysAllow,
    AlwaysAllowTool,
    AlwaysAllowMcpServer,
    Reject,
    Cancel,
}

impl ConfirmationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::AlwaysAllow => "alwaysAllow",
            Self::AlwaysAllowTool => "alwaysAllowTool",
            Self::AlwaysAllowMcpServer => "alwaysAllowMcpServer",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
        }
    }

    /// Outcomes that let the tool call proceed
    pub fn is_allow(&self) -> bool {
        matches!(
            self,
            Self::Allow | Self::AlwaysAllow | Self::AlwaysAllowTool | Self::AlwaysAllowMcpServer
        )
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject)
    }
}

impl std::fmt::Display for ConfirmationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfirmationOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "alwaysAllow" => Ok(Self::AlwaysAllow),
            "alwaysAllowTool" => Ok(Self::AlwaysAllowTool),
            "alwaysAllowMcpServer" => Ok(Self::AlwaysAllowMcpServer),
            "reject" => Ok(Self::Reject),
            "cancel" => Ok(Self::Cancel),
            other => Err(format!("unknown confirmation outcome: {}", other)),
        }
    }
}

/// Resolution of a confirmation request, sent back to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResponse {
    pub session_id: String,
    pub request_id: RequestId,
    pub tool_call_id: String,
    pub outcome: ConfirmationOutcome,
}

/// One rolled-up transcript entry sent along with a new user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sender: Sender,
    pub content: String,
}

/// New user message for a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub conversation_id: String,
    pub text: String,
    pub history: Vec<HistoryEntry>,
}
