use crate::error::EngineError;
use crate::store::ConversationStore;
use chrono::Utc;
use concord_protocol::Conversation;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::broadcast;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

/// Private working copy of a conversation for the duration of one update
#[derive(Debug)]
pub struct Transaction {
    conversation: Conversation,
}

impl Transaction {
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

impl Deref for Transaction {
    type Target = Conversation;

    fn deref(&self) -> &Self::Target {
        &self.conversation
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conversation
    }
}

/// Serializes copy-on-write updates to the conversation store.
///
/// Readers only ever see committed snapshots; a mutator works on a deep
/// copy that replaces the stored conversation when it returns.
pub struct UpdateCoordinator {
    store: Arc<dyn ConversationStore>,
    commit_lock: Mutex<()>,
    snapshots: broadcast::Sender<Arc<Conversation>>,
}

impl UpdateCoordinator {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            store,
            commit_lock: Mutex::new(()),
            snapshots,
        }
    }

    /// Receives every committed snapshot, across all conversations
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Conversation>> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self, id: &str) -> Option<Arc<Conversation>> {
        self.store.get(id)
    }

    pub fn list(&self) -> Vec<Arc<Conversation>> {
        self.store.list()
    }

    pub fn insert(&self, conversation: Conversation) -> Arc<Conversation> {
        let _guard = self.commit_lock.lock();
        let snapshot = Arc::new(conversation);
        self.store.put(snapshot.clone());
        let _ = self.snapshots.send(snapshot.clone());
        snapshot
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Conversation>> {
        let _guard = self.commit_lock.lock();
        self.store.delete(id)
    }

    /// Runs `mutator` against a copy of conversation `id` and commits it.
    ///
    /// When the mutator leaves the copy unchanged nothing is committed and
    /// no snapshot is published.
    pub fn update_conversation<R>(
        &self,
        id: &str,
        mutator: impl FnOnce(&mut Transaction) -> R,
    ) -> Result<R, EngineError> {
        let _guard = self.commit_lock.lock();

        let current = self
            .store
            .get(id)
            .ok_or_else(|| EngineError::ConversationNotFound(id.to_string()))?;

        let mut tx = Transaction {
            conversation: (*current).clone(),
        };
        let result = mutator(&mut tx);

        if tx.conversation == *current {
            return Ok(result);
        }

        tx.conversation.updated_at = Utc::now();
        let snapshot = Arc::new(tx.conversation);
        self.store.put(snapshot.clone());
        let _ = self.snapshots.send(snapshot);

        Ok(result)
    }
}
