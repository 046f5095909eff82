//! Agent-level streaming events.
//!
//! `AgentStreamEvent` wraps provider-level stream chunks into higher-level
//! events that the gateway forwards to the browser over SSE and the CLI
//! prints to the terminal.

use serde::{Deserialize, Serialize};
use toolchat_core::provider::Usage;
use tokio::sync::mpsc;

/// Events emitted by the agent while it runs.
///
/// - `chunk`      : partial text token from the LLM
/// - `tool_call`  : agent is invoking a tool
/// - `tool_result`: tool execution completed
/// - `done`       : the run finished with an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text token from the LLM.
    Chunk { content: String },

    /// The agent is calling a tool.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// The run is complete.
    Done {
        answer: String,
        usage: Option<Usage>,
        iterations: usize,
        tool_calls_made: usize,
    },
}

impl AgentStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
        }
    }
}

/// Observer handed to a run; receives events in the order they happen.
///
/// `emit` is synchronous and must not fail the run, so implementations
/// drop events they cannot deliver.
pub trait EventSink<E = AgentStreamEvent>: Send {
    fn emit(&mut self, event: E);
}

impl<E: Send> EventSink<E> for Vec<E> {
    fn emit(&mut self, event: E) {
        self.push(event);
    }
}

impl<E: Send> EventSink<E> for mpsc::UnboundedSender<E> {
    fn emit(&mut self, event: E) {
        // The receiver going away (client disconnected) must not stop the turn.
        let _ = self.send(event);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<E> EventSink<E> for NullSink {
    fn emit(&mut self, _event: E) {}
}
