use crate::error::BridgeError;
use async_trait::async_trait;
use concord_protocol::{ConfirmationResponse, SendMessage};

/// Outbound commands to the backend, carried by the host bridge
#[async_trait]
pub trait CommandBridge: Send + Sync {
    async fn start_session(&self, conversation_id: &str) -> Result<(), BridgeError>;

    async fn send_message(&self, message: SendMessage) -> Result<(), BridgeError>;

    async fn send_confirmation(&self, response: ConfirmationResponse) -> Result<(), BridgeError>;

    async fn kill_process(&self, conversation_id: &str) -> Result<(), BridgeError>;
}
