//! # toolchat core
//!
//! Domain types, traits, and error definitions shared by every toolchat crate.
//! Nothing here talks to the network; providers and tools implement the
//! traits in their own crates.
//!
//! - [`Message`] is what flows to and from a model.
//! - [`Turn`] and [`Transcript`] are what a chat session shows its user.
//! - [`Provider`] and [`Tool`] are the two seams the agent is built against.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod transcript;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, MessageToolCall, Role, SessionId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
pub use transcript::{Transcript, Turn, TurnRole};
