#![allow(dead_code)]

use async_trait::async_trait;
use concord_engine::{BridgeError, CommandBridge, ReconciliationEngine};
use concord_protocol::{
    BackendEvent, ConfirmationDescriptor, ConfirmationRequested, ConfirmationResponse, ErrorEvent,
    RequestId, SendMessage, ToolCallCreated, ToolCallUpdated,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Bridge double that records commands and can be told to fail or stall
#[derive(Default)]
pub struct MockBridge {
    pub confirmations: Mutex<Vec<ConfirmationResponse>>,
    pub messages: Mutex<Vec<SendMessage>>,
    pub sessions: Mutex<Vec<String>>,
    pub killed: Mutex<Vec<String>>,
    pub fail_with: Mutex<Option<BridgeError>>,
    pub delay: Mutex<Option<Duration>>,
}

impl MockBridge {
    pub fn failing(error: BridgeError) -> Self {
        let bridge = Self::default();
        *bridge.fail_with.lock() = Some(error);
        bridge
    }

    pub fn slow(delay: Duration) -> Self {
        let bridge = Self::default();
        *bridge.delay.lock() = Some(delay);
        bridge
    }

    async fn outcome(&self) -> Result<(), BridgeError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail_with.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CommandBridge for MockBridge {
    async fn start_session(&self, conversation_id: &str) -> Result<(), BridgeError> {
        self.outcome().await?;
        self.sessions.lock().push(conversation_id.to_string());
        Ok(())
    }

    async fn send_message(&self, message: SendMessage) -> Result<(), BridgeError> {
        self.outcome().await?;
        self.messages.lock().push(message);
        Ok(())
    }

    async fn send_confirmation(&self, response: ConfirmationResponse) -> Result<(), BridgeError> {
        self.confirmations.lock().push(response);
        self.outcome().await
    }

    async fn kill_process(&self, conversation_id: &str) -> Result<(), BridgeError> {
        self.killed.lock().push(conversation_id.to_string());
        self.outcome().await
    }
}

pub fn make_engine(bridge: Arc<MockBridge>) -> Arc<ReconciliationEngine> {
    let engine = ReconciliationEngine::with_bridge(bridge);
    engine.open_conversation("c1", "Test conversation");
    Arc::new(engine)
}

pub fn make_created(id: &str, name: &str) -> BackendEvent {
    BackendEvent::ToolCallCreated(ToolCallCreated {
        id: id.to_string(),
        name: name.to_string(),
        parameters: serde_json::json!({}),
        label: None,
        icon: None,
    })
}

pub fn make_updated(id: &str, status: &str, content: Option<Value>) -> BackendEvent {
    BackendEvent::ToolCallUpdated(ToolCallUpdated {
        tool_call_id: id.to_string(),
        status: status.to_string(),
        content,
    })
}

pub fn make_confirmation(request_id: i64, tool_call_id: Option<&str>, kind: &str) -> BackendEvent {
    BackendEvent::ConfirmationRequested(ConfirmationRequested {
        request_id: RequestId::Number(request_id),
        session_id: "ses_1".to_string(),
        tool_call_id: tool_call_id.map(str::to_string),
        label: None,
        icon: None,
        content: Value::Null,
        confirmation: ConfirmationDescriptor::new(kind),
    })
}

pub fn make_error(message: &str) -> BackendEvent {
    BackendEvent::Error(ErrorEvent {
        message: message.to_string(),
    })
}
