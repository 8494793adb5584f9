use crate::engine::ReconciliationEngine;
use crate::error::EngineError;
use concord_events::{ChannelEvent, EventChannel, Subscriber};
use concord_protocol::ChannelName;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Live subscription of one conversation to its backend channels.
///
/// Every channel forwards into a single queue drained by one task, so the
/// engine sees one writer per conversation. Order holds within a channel
/// only.
pub struct ConversationListener {
    conversation_id: String,
    forwarders: Vec<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
    applied: watch::Receiver<usize>,
}

impl ConversationListener {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Number of events the pump has applied so far
    pub fn applied(&self) -> usize {
        *self.applied.borrow()
    }

    /// Waits until at least `count` events have been applied.
    ///
    /// Returns false if the pump stopped first.
    pub async fn wait_for_applied(&mut self, count: usize) -> bool {
        self.applied.wait_for(|applied| *applied >= count).await.is_ok()
    }

    /// Stops listening. Events already queued are still applied before
    /// this returns.
    pub async fn detach(mut self) {
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
        self.wait_pump().await;
        tracing::debug!("Detached from {}", self.conversation_id);
    }

    /// Waits for every channel to close and the queue to drain
    pub async fn join(mut self) {
        for forwarder in self.forwarders.drain(..) {
            let _ = forwarder.await;
        }
        self.wait_pump().await;
    }

    async fn wait_pump(&mut self) {
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                tracing::warn!("Event pump for {} ended abnormally: {}", self.conversation_id, e);
            }
        }
    }
}

impl Drop for ConversationListener {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}

impl ReconciliationEngine {
    /// Subscribes to all of a conversation's channels and applies their
    /// events as they arrive.
    ///
    /// A failed subscription is logged and returned; nothing is retried.
    pub async fn attach(
        self: &Arc<Self>,
        channel: &dyn EventChannel,
        conversation_id: &str,
    ) -> Result<ConversationListener, EngineError> {
        let mut subscribers = Vec::new();
        for name in ChannelName::all_for(conversation_id) {
            match channel.subscribe(&name).await {
                Ok(subscriber) => subscribers.push(subscriber),
                Err(e) => {
                    tracing::error!("Failed to subscribe to {}: {}", name, e);
                    return Err(e.into());
                }
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let forwarders = subscribers
            .into_iter()
            .map(|subscriber| tokio::spawn(forward(subscriber, tx.clone())))
            .collect();
        drop(tx);

        let (applied_tx, applied) = watch::channel(0);
        let pump = tokio::spawn(drain_events(self.clone(), rx, applied_tx));

        tracing::debug!("Attached to {}", conversation_id);
        Ok(ConversationListener {
            conversation_id: conversation_id.to_string(),
            forwarders,
            pump: Some(pump),
            applied,
        })
    }
}

async fn forward(mut subscriber: Subscriber, tx: mpsc::UnboundedSender<ChannelEvent>) {
    while let Some(event) = subscriber.recv_channel_event().await {
        if tx.send(event).is_err() {
            break;
        }
    }
    subscriber.unsubscribe();
}

async fn drain_events(
    engine: Arc<ReconciliationEngine>,
    mut rx: mpsc::UnboundedReceiver<ChannelEvent>,
    applied: watch::Sender<usize>,
) {
    while let Some(ChannelEvent { channel, event }) = rx.recv().await {
        if let Err(e) = engine.apply(&channel.conversation_id, event) {
            tracing::warn!("Failed to apply event from {}: {}", channel, e);
        }
        applied.send_modify(|count| *count += 1);
    }
}
