//! Replays a recorded event log through an engine attached to an
//! in-process hub.
//!
//! Each non-empty log line is one JSON object:
//!
//! ```text
//! {"channel": "tool-call-abc", "payload": {"id": "1", "name": "read_file"}}
//! {"resolve": {"toolCallId": "1", "outcome": "allow"}}
//! {"send": {"conversationId": "abc", "text": "continue"}}
//! ```
//!
//! Lines starting with `#` are comments.

use crate::bridge::{RecordedCommand, RecordingBridge};
use anyhow::{Context, Result};
use async_trait::async_trait;
use concord_config::EngineConfig;
use concord_engine::{
    ConversationListener, InMemoryConversationStore, ReconciliationEngine, ResolveOutcome,
};
use concord_events::{
    BroadcastHub, ChannelEvent, EventChannel, EventHandler, HandlerRegistry, SubscriberRunner,
};
use concord_protocol::{ChannelName, ConfirmationOutcome, Conversation};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LogEntry {
    Event {
        channel: String,
        #[serde(default)]
        payload: Value,
    },
    Resolve {
        resolve: ResolveEntry,
    },
    Send {
        send: SendEntry,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveEntry {
    pub tool_call_id: String,
    pub outcome: ConfirmationOutcome,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEntry {
    pub conversation_id: String,
    pub text: String,
}

pub fn parse_log(content: &str) -> Result<Vec<LogEntry>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid log entry on line {}", index + 1))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRecord {
    pub tool_call_id: String,
    pub outcome: ConfirmationOutcome,
    pub result: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub conversations: Vec<Conversation>,
    pub resolutions: Vec<ResolutionRecord>,
    pub commands: Vec<RecordedCommand>,
    pub events: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_counts: Option<BTreeMap<String, usize>>,
}

/// Counts delivered events per channel kind
#[derive(Default)]
pub struct KindCounter {
    counts: Mutex<BTreeMap<String, usize>>,
}

impl KindCounter {
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.counts.lock().clone()
    }
}

#[async_trait]
impl EventHandler for KindCounter {
    fn name(&self) -> &str {
        "kind-counter"
    }

    async fn handle(&self, event: &ChannelEvent) {
        *self
            .counts
            .lock()
            .entry(event.channel.kind.to_string())
            .or_default() += 1;
    }
}

struct TrackedListener {
    listener: ConversationListener,
    published: usize,
}

struct ReplaySession {
    engine: Arc<ReconciliationEngine>,
    bridge: Arc<RecordingBridge>,
    hub: BroadcastHub,
    listeners: HashMap<String, TrackedListener>,
    order: Vec<String>,
    counter: Option<(Arc<KindCounter>, SubscriberRunner)>,
    runners: Vec<JoinHandle<()>>,
    events: usize,
    skipped: usize,
    resolutions: Vec<ResolutionRecord>,
}

impl ReplaySession {
    fn new(config: &EngineConfig, stats: bool) -> Self {
        let bridge = Arc::new(RecordingBridge::new());
        let engine = Arc::new(ReconciliationEngine::new(
            config,
            Arc::new(InMemoryConversationStore::new()),
            bridge.clone(),
        ));

        let counter = stats.then(|| {
            let counter = Arc::new(KindCounter::default());
            let mut registry = HandlerRegistry::new();
            registry.register(counter.clone());
            (counter, SubscriberRunner::new(Arc::new(registry)))
        });

        Self {
            hub: BroadcastHub::with_capacity(engine.channel_capacity()),
            engine,
            bridge,
            listeners: HashMap::new(),
            order: Vec::new(),
            counter,
            runners: Vec::new(),
            events: 0,
            skipped: 0,
            resolutions: Vec::new(),
        }
    }

    async fn open(&mut self, conversation_id: &str) -> Result<()> {
        if self.listeners.contains_key(conversation_id) {
            return Ok(());
        }

        self.engine.open_conversation(conversation_id, conversation_id);
        if let Err(e) = self.engine.start_session(conversation_id).await {
            tracing::warn!("Session start failed for {}: {}", conversation_id, e);
        }

        let listener = self
            .engine
            .attach(&self.hub, conversation_id)
            .await
            .with_context(|| format!("Failed to attach to {}", conversation_id))?;

        if let Some((_, runner)) = &self.counter {
            let mut subscribers = Vec::new();
            for name in ChannelName::all_for(conversation_id) {
                subscribers.push(self.hub.subscribe(&name).await?);
            }
            self.runners.extend(runner.spawn_all(subscribers));
        }

        self.listeners.insert(
            conversation_id.to_string(),
            TrackedListener {
                listener,
                published: 0,
            },
        );
        self.order.push(conversation_id.to_string());
        Ok(())
    }

    async fn publish(&mut self, channel: &str, payload: Value) -> Result<()> {
        let name: ChannelName = match channel.parse() {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("Skipping event: {}", e);
                self.skipped += 1;
                return Ok(());
            }
        };

        self.open(&name.conversation_id).await?;

        match self.hub.publish_raw(&name, payload) {
            Ok(()) => {
                self.events += 1;
                if let Some(tracked) = self.listeners.get_mut(&name.conversation_id) {
                    tracked.published += 1;
                    // Lines land on different channels; apply each before the next
                    settle_listener(&name.conversation_id, tracked).await;
                }
            }
            Err(e) => {
                tracing::warn!("Skipping event: {}", e);
                self.skipped += 1;
            }
        }

        Ok(())
    }

    /// Waits until every published event has been applied
    async fn settle(&mut self) {
        for (id, tracked) in self.listeners.iter_mut() {
            settle_listener(id, tracked).await;
        }
    }

    async fn resolve(&mut self, entry: ResolveEntry) {
        self.settle().await;
        let outcome = self.engine.resolve(&entry.tool_call_id, entry.outcome).await;
        let result = match outcome {
            ResolveOutcome::Resolved => "resolved".to_string(),
            ResolveOutcome::NotPending => "not pending".to_string(),
            ResolveOutcome::BridgeFailed(e) => format!("bridge failed: {}", e),
        };
        self.resolutions.push(ResolutionRecord {
            tool_call_id: entry.tool_call_id,
            outcome: entry.outcome,
            result,
        });
    }

    async fn send(&mut self, entry: SendEntry) -> Result<()> {
        self.open(&entry.conversation_id).await?;
        self.settle().await;
        if let Err(e) = self
            .engine
            .send_user_message(&entry.conversation_id, entry.text)
            .await
        {
            tracing::warn!("Failed to send message: {}", e);
        }
        Ok(())
    }

    async fn finish(mut self) -> ReplayReport {
        self.hub.close();
        for id in &self.order {
            if let Some(tracked) = self.listeners.remove(id) {
                tracked.listener.join().await;
            }
        }
        for runner in self.runners.drain(..) {
            let _ = runner.await;
        }

        let conversations = self
            .order
            .iter()
            .filter_map(|id| self.engine.conversation(id))
            .map(|conversation| (*conversation).clone())
            .collect();

        ReplayReport {
            conversations,
            resolutions: self.resolutions,
            commands: self.bridge.commands(),
            events: self.events,
            skipped: self.skipped,
            channel_counts: self.counter.map(|(counter, _)| counter.counts()),
        }
    }
}

async fn settle_listener(conversation_id: &str, tracked: &mut TrackedListener) {
    let wait = tracked.listener.wait_for_applied(tracked.published);
    match tokio::time::timeout(SETTLE_TIMEOUT, wait).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!("Listener for {} stopped early", conversation_id),
        Err(_) => tracing::warn!(
            "Timed out waiting for {} events on {}",
            tracked.published,
            conversation_id
        ),
    }
}

/// Feeds `entries` through a fresh engine and reports the final state
pub async fn replay(entries: Vec<LogEntry>, config: &EngineConfig, stats: bool) -> Result<ReplayReport> {
    let mut session = ReplaySession::new(config, stats);

    for entry in entries {
        match entry {
            LogEntry::Event { channel, payload } => session.publish(&channel, payload).await?,
            LogEntry::Resolve { resolve } => session.resolve(resolve).await,
            LogEntry::Send { send } => session.send(send).await?,
        }
    }

    Ok(session.finish().await)
}
