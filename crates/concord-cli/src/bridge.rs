use async_trait::async_trait;
use concord_engine::{BridgeError, CommandBridge};
use concord_protocol::{ConfirmationResponse, SendMessage};
use parking_lot::Mutex;
use serde::Serialize;

/// Outbound command captured during a replay
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum RecordedCommand {
    #[serde(rename_all = "camelCase")]
    StartSession { conversation_id: String },
    SendMessage(SendMessage),
    SendConfirmation(ConfirmationResponse),
    #[serde(rename_all = "camelCase")]
    KillProcess { conversation_id: String },
}

/// Bridge with no backend behind it: every command succeeds and is kept
#[derive(Default)]
pub struct RecordingBridge {
    commands: Mutex<Vec<RecordedCommand>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock().clone()
    }

    fn record(&self, command: RecordedCommand) {
        tracing::debug!("-> {:?}", command);
        self.commands.lock().push(command);
    }
}

#[async_trait]
impl CommandBridge for RecordingBridge {
    async fn start_session(&self, conversation_id: &str) -> Result<(), BridgeError> {
        self.record(RecordedCommand::StartSession {
            conversation_id: conversation_id.to_string(),
        });
        Ok(())
    }

    async fn send_message(&self, message: SendMessage) -> Result<(), BridgeError> {
        self.record(RecordedCommand::SendMessage(message));
        Ok(())
    }

    async fn send_confirmation(&self, response: ConfirmationResponse) -> Result<(), BridgeError> {
        self.record(RecordedCommand::SendConfirmation(response));
        Ok(())
    }

    async fn kill_process(&self, conversation_id: &str) -> Result<(), BridgeError> {
        self.record(RecordedCommand::KillProcess {
            conversation_id: conversation_id.to_string(),
        });
        Ok(())
    }
}
