use async_trait::async_trait;
use concord_protocol::{BackendEvent, ChannelName};
use tokio::sync::broadcast;

/// An event together with the channel it arrived on
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    pub channel: ChannelName,
    pub event: BackendEvent,
}

impl ChannelEvent {
    pub fn conversation_id(&self) -> &str {
        &self.channel.conversation_id
    }
}

/// Side observer driven by a [`crate::SubscriberRunner`]
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &str;
    async fn handle(&self, event: &ChannelEvent);
}

/// Receiving end of one named channel.
///
/// Dropping it unsubscribes.
pub struct Subscriber {
    channel: ChannelName,
    receiver: broadcast::Receiver<BackendEvent>,
}

impl Subscriber {
    pub fn new(channel: ChannelName, receiver: broadcast::Receiver<BackendEvent>) -> Self {
        Self { channel, receiver }
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub async fn recv(&mut self) -> Option<BackendEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Subscriber on {} lagged, missed {} events", self.channel, n);
                    continue;
                }
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<BackendEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("Subscriber on {} lagged, missed {} events", self.channel, n);
                    continue;
                }
            }
        }
    }

    /// Receives the next event wrapped with its channel name
    pub async fn recv_channel_event(&mut self) -> Option<ChannelEvent> {
        let event = self.recv().await?;
        Some(ChannelEvent {
            channel: self.channel.clone(),
            event,
        })
    }

    pub fn unsubscribe(self) {
        tracing::trace!("Unsubscribed from {}", self.channel);
    }
}
