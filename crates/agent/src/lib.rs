//! The toolchat agent: an OpenAI function-calling loop.
//!
//! Each run follows a **Call → Act → Observe** cycle:
//!
//! 1. **Build context**: system prompt, buffered prior exchanges, the prompt
//! 2. **Stream** a completion with every tool definition attached
//! 3. **If tool calls**: execute them, append the results, loop back to 2
//! 4. **If text only**: that text is the answer
//!
//! Progress is reported to an [`EventSink`] as it happens. The loop stops at
//! the first text-only response or when the iteration limit is reached.

pub mod functions_agent;
pub mod memory;
pub mod stream_event;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use functions_agent::{FunctionsAgent, STOPPED_MESSAGE};
pub use memory::ConversationBuffer;
pub use stream_event::{AgentStreamEvent, EventSink, NullSink};
