use concord_events::ChannelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Failure reported by the host bridge when sending a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("command rejected by backend: {0}")]
    Rejected(String),

    #[error("bridge transport error: {0}")]
    Transport(String),
}
