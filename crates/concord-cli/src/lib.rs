//! Concord CLI
//!
//! Provides the `concord` binary, which replays a recorded backend event log
//! through the reconciliation engine and prints the resulting transcripts.

pub mod bridge;
pub mod commands;
pub mod render;
pub mod replay;

pub use bridge::RecordingBridge;
pub use commands::{Cli, Commands};
pub use replay::{parse_log, replay, LogEntry, ReplayReport};
