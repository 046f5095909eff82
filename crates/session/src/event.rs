//! Events a turn reports to whoever hosts the session.

use serde_json::{Value, json};
use toolchat_agent::{AgentStreamEvent, EventSink};
use toolchat_core::Turn;

/// Everything observable about one turn, in the order it happens:
/// `User`, agent steps, `AgentAnswer`, `Assistant`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The prompt was accepted and recorded.
    User(Turn),
    /// An intermediate step of the agent run.
    Agent(AgentStreamEvent),
    /// The agent's final answer. Shown once, never recorded.
    AgentAnswer { content: String },
    /// The plain model answer, recorded as the assistant turn.
    Assistant(Turn),
    /// The turn failed; reported by the hosting layer.
    Error { message: String },
}

impl SessionEvent {
    /// SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Agent(e) => e.event_type(),
            Self::AgentAnswer { .. } => "agent_answer",
            Self::Assistant(_) => "assistant",
            Self::Error { .. } => "error",
        }
    }

    /// JSON payload for the event.
    pub fn data(&self) -> Value {
        match self {
            Self::User(turn) | Self::Assistant(turn) => {
                json!({ "role": turn.role.as_str(), "content": turn.content })
            }
            Self::Agent(e) => serde_json::to_value(e).unwrap_or(Value::Null),
            Self::AgentAnswer { content } => json!({ "content": content }),
            Self::Error { message } => json!({ "message": message }),
        }
    }
}

/// Lets an agent run report into a session-level sink.
pub struct AgentEvents<'a> {
    inner: &'a mut dyn EventSink<SessionEvent>,
}

impl<'a> AgentEvents<'a> {
    pub fn new(inner: &'a mut dyn EventSink<SessionEvent>) -> Self {
        Self { inner }
    }
}

impl EventSink for AgentEvents<'_> {
    fn emit(&mut self, event: AgentStreamEvent) {
        self.inner.emit(SessionEvent::Agent(event));
    }
}
