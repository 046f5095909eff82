//! The function-calling agent loop.

use std::sync::Arc;

use toolchat_config::AgentConfig;
use toolchat_core::message::{Message, MessageToolCall};
use toolchat_core::provider::Usage;
use toolchat_core::tool::{ToolCall, ToolRegistry};
use toolchat_providers::ChatModel;
use tracing::{debug, info, warn};

use crate::memory::ConversationBuffer;
use crate::stream_event::{AgentStreamEvent, EventSink};

/// Answer given when the loop runs out of iterations.
pub const STOPPED_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";
const DEFAULT_MAX_ITERATIONS: usize = 15;

/// An agent that lets the model pick tools through function calling.
///
/// Built once per session and reused for every turn; the conversation
/// buffer it owns carries earlier exchanges into later runs.
pub struct FunctionsAgent {
    model: ChatModel,
    tools: Arc<ToolRegistry>,
    memory: ConversationBuffer,
    system_prompt: String,
    max_iterations: usize,
}

/// What one pass through the model produced.
struct Step {
    text: String,
    tool_calls: Vec<MessageToolCall>,
    usage: Option<Usage>,
}

impl FunctionsAgent {
    pub fn new(model: ChatModel, tools: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            tools,
            memory: ConversationBuffer::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Create an agent with the prompt and limit from configuration.
    pub fn from_config(model: ChatModel, tools: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        Self::new(model, tools)
            .with_system_prompt(&config.system_prompt)
            .with_max_iterations(config.max_iterations)
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the maximum number of model calls per run.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn memory(&self) -> &ConversationBuffer {
        &self.memory
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the agent on one prompt and return its final answer.
    ///
    /// Intermediate steps go to `sink` as they happen, ending with `Done`.
    /// Provider errors abort the run; nothing is saved to memory then.
    /// Tool failures are handed back to the model as the tool's output.
    pub async fn run(
        &mut self,
        prompt: &str,
        sink: &mut dyn EventSink,
    ) -> Result<String, toolchat_core::Error> {
        info!(
            model = %self.model.model(),
            remembered = self.memory.exchanges(),
            "Agent run started"
        );

        let mut messages = Vec::with_capacity(self.memory.messages().len() + 2);
        messages.push(Message::system(&self.system_prompt));
        messages.extend(self.memory.messages().iter().cloned());
        messages.push(Message::user(prompt));

        let definitions = self.tools.definitions();
        let mut tool_calls_made = 0;
        let mut usage = None;
        let mut answer = None;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            debug!(iteration = iterations, "Agent loop iteration");

            let step = self.step(messages.clone(), &definitions, sink).await?;
            if step.usage.is_some() {
                usage = step.usage;
            }

            if step.tool_calls.is_empty() {
                answer = Some(step.text);
                break;
            }

            debug!(tool_count = step.tool_calls.len(), "Executing tool calls");
            messages.push(Message::assistant_tool_calls(
                step.text,
                step.tool_calls.clone(),
            ));

            for tc in &step.tool_calls {
                let output = self.execute_tool(tc, sink).await;
                messages.push(Message::tool_result(&tc.id, output));
                tool_calls_made += 1;
            }
        }

        let answer = answer.unwrap_or_else(|| {
            warn!(iterations, "Max iterations reached, stopping agent");
            STOPPED_MESSAGE.to_string()
        });

        sink.emit(AgentStreamEvent::Done {
            answer: answer.clone(),
            usage,
            iterations,
            tool_calls_made,
        });
        self.memory.save_context(prompt, &answer);

        info!(iterations, tool_calls_made, "Agent run finished");
        Ok(answer)
    }

    /// Stream one completion, forwarding text deltas to the sink.
    async fn step(
        &self,
        messages: Vec<Message>,
        definitions: &[toolchat_core::ToolDefinition],
        sink: &mut dyn EventSink,
    ) -> Result<Step, toolchat_core::Error> {
        let mut rx = self.model.stream(messages, definitions.to_vec()).await?;
        let mut step = Step {
            text: String::new(),
            tool_calls: Vec::new(),
            usage: None,
        };

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                step.text.push_str(&content);
                sink.emit(AgentStreamEvent::Chunk { content });
            }
            if chunk.done {
                step.tool_calls = chunk.tool_calls;
                step.usage = chunk.usage;
                break;
            }
        }

        Ok(step)
    }

    /// Execute one requested call; the returned text goes back to the model.
    async fn execute_tool(&self, tc: &MessageToolCall, sink: &mut dyn EventSink) -> String {
        let input: serde_json::Value = if tc.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&tc.arguments)
                .unwrap_or_else(|_| serde_json::Value::String(tc.arguments.clone()))
        };

        sink.emit(AgentStreamEvent::ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            input: input.clone(),
        });

        let call = ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments: input,
        };

        let (output, success) = match self.tools.execute(&call).await {
            Ok(result) => (result.output, result.success),
            Err(e) => {
                warn!(tool = %tc.name, error = %e, "Tool execution failed");
                (format!("Error: {e}"), false)
            }
        };

        sink.emit(AgentStreamEvent::ToolResult {
            id: tc.id.clone(),
            name: tc.name.clone(),
            output: output.clone(),
            success,
        });

        output
    }
}
