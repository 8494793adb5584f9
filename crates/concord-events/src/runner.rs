use crate::subscriber::{ChannelEvent, EventHandler, Subscriber};
use std::sync::Arc;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Hands `event` to every handler in registration order
    pub async fn dispatch(&self, event: &ChannelEvent) {
        for handler in &self.handlers {
            tracing::trace!("Dispatching {} to {}", event.channel, handler.name());
            handler.handle(event).await;
        }
    }
}

/// Drives subscribers through a shared handler registry
#[derive(Clone)]
pub struct SubscriberRunner {
    registry: Arc<HandlerRegistry>,
}

impl SubscriberRunner {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub async fn run(&self, mut subscriber: Subscriber) {
        while let Some(event) = subscriber.recv_channel_event().await {
            self.registry.dispatch(&event).await;
        }

        tracing::debug!(
            "Channel {} closed, stopping subscriber runner",
            subscriber.channel()
        );
    }

    pub fn spawn(&self, subscriber: Subscriber) -> tokio::task::JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move {
            runner.run(subscriber).await;
        })
    }

    pub fn spawn_all(
        &self,
        subscribers: impl IntoIterator<Item = Subscriber>,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        subscribers.into_iter().map(|s| self.spawn(s)).collect()
    }
}
