pub mod accumulator;
pub mod bridge;
pub mod classify;
pub mod confirmation;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod listener;
pub mod raw_io;
pub mod store;
pub mod tool_calls;

pub use bridge::CommandBridge;
pub use classify::ResultClassifier;
pub use confirmation::{ConfirmationRegistry, PendingConfirmation, ResolveOutcome};
pub use coordinator::{Transaction, UpdateCoordinator};
pub use engine::{ReconciliationEngine, REJECTED_RESULT};
pub use error::{BridgeError, EngineError};
pub use listener::ConversationListener;
pub use raw_io::RawIoTracker;
pub use store::{ConversationStore, InMemoryConversationStore};
pub use tool_calls::{ToolCallMachine, UpdateOutcome};
