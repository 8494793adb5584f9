//! Concord Protocol - Shared types for conversation reconciliation
//!
//! This crate defines the fundamental types used across Concord:
//! - Transcript model (conversations, messages, parts, tool calls)
//! - Backend event payloads and per-conversation channel names
//! - Outbound command payloads sent through the host bridge

mod commands;
mod events;
mod messages;
mod types;

pub use commands::*;
pub use events::*;
pub use messages::*;
pub use types::*;
