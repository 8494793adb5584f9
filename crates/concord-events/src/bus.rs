use crate::error::ChannelError;
use crate::subscriber::Subscriber;
use async_trait::async_trait;
use concord_protocol::{BackendEvent, ChannelName};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Typed subscribe/publish over named per-conversation channels.
///
/// Delivery within one channel follows publish order. Nothing is guaranteed
/// across channels.
#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn subscribe(&self, channel: &ChannelName) -> Result<Subscriber, ChannelError>;
    fn publish(&self, conversation_id: &str, event: BackendEvent);
}

/// In-process hub with one broadcast channel per channel name
pub struct BroadcastHub {
    senders: Arc<RwLock<HashMap<ChannelName, broadcast::Sender<BackendEvent>>>>,
    capacity: usize,
    closed: Arc<AtomicBool>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            senders: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    #[allow(clippy::result_large_err)]
    pub fn try_publish(
        &self,
        channel: &ChannelName,
        event: BackendEvent,
    ) -> Result<usize, broadcast::error::SendError<BackendEvent>> {
        let sender = self.senders.read().get(channel).cloned();
        match sender {
            Some(sender) => sender.send(event),
            None => Err(broadcast::error::SendError(event)),
        }
    }

    /// Decodes a raw host-bridge payload for `channel` and publishes it
    pub fn publish_raw(
        &self,
        channel: &ChannelName,
        payload: serde_json::Value,
    ) -> Result<(), ChannelError> {
        let event = BackendEvent::decode(channel.kind, payload).map_err(|source| {
            ChannelError::Decode {
                channel: channel.clone(),
                source,
            }
        })?;
        self.publish(&channel.conversation_id, event);
        Ok(())
    }

    pub fn subscriber_count(&self, channel: &ChannelName) -> usize {
        self.senders
            .read()
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Drops every channel; open subscribers drain and then end, and new
    /// subscriptions fail with [`ChannelError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.senders.write().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for BroadcastHub {
    fn clone(&self) -> Self {
        Self {
            senders: self.senders.clone(),
            capacity: self.capacity,
            closed: self.closed.clone(),
        }
    }
}

#[async_trait]
impl EventChannel for BroadcastHub {
    async fn subscribe(&self, channel: &ChannelName) -> Result<Subscriber, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }

        let receiver = self
            .senders
            .write()
            .entry(channel.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        Ok(Subscriber::new(channel.clone(), receiver))
    }

    fn publish(&self, conversation_id: &str, event: BackendEvent) {
        if self.is_closed() {
            tracing::debug!("Dropping {} event, hub is closed", event.kind());
            return;
        }

        let channel = ChannelName::new(conversation_id, event.kind());
        if let Err(e) = self.try_publish(&channel, event) {
            tracing::debug!(
                "Dropped {} event on {} (no subscribers)",
                e.0.kind(),
                channel
            );
        }
    }
}
