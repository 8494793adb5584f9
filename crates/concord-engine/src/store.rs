use concord_protocol::Conversation;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Keyed storage for committed conversation snapshots
pub trait ConversationStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Arc<Conversation>>;
    fn put(&self, conversation: Arc<Conversation>);
    fn delete(&self, id: &str) -> Option<Arc<Conversation>>;
    /// Most recently updated first
    fn list(&self) -> Vec<Arc<Conversation>>;
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Arc<Conversation>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn get(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations.read().get(id).cloned()
    }

    fn put(&self, conversation: Arc<Conversation>) {
        self.conversations
            .write()
            .insert(conversation.id.clone(), conversation);
    }

    fn delete(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations.write().remove(id)
    }

    fn list(&self) -> Vec<Arc<Conversation>> {
        let mut all: Vec<_> = self.conversations.read().values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }
}
