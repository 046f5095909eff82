//! One chat session: transcript, agent, and the turn state machine.

use std::sync::Arc;

use toolchat_agent::{EventSink, FunctionsAgent};
use toolchat_config::{AgentConfig, AppConfig, ModelSettings};
use toolchat_core::tool::ToolRegistry;
use toolchat_core::{Provider, SessionId, Transcript, Turn};
use toolchat_providers::ChatModel;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::event::{AgentEvents, SessionEvent};

/// Where a session is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingInput,
    AgentRunning,
    PlainModelRunning,
}

/// Both answers produced by an accepted turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Shown to the user, never recorded.
    pub agent_answer: String,
    /// Recorded as the assistant turn.
    pub plain_answer: String,
}

/// A single user's conversation.
///
/// The agent is built once here and reused for every turn, so its memory
/// spans the whole session. Nothing is shared with other sessions.
pub struct ChatSession {
    id: SessionId,
    transcript: Transcript,
    agent: FunctionsAgent,
    model: ChatModel,
    phase: TurnPhase,
}

impl ChatSession {
    /// Start a session with default agent settings.
    ///
    /// Fails when the temperature is not a number.
    pub fn new(
        settings: &ModelSettings,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
    ) -> Result<Self, SessionError> {
        Self::build(settings, provider, tools, &AgentConfig::default())
    }

    /// Start a session from the full application configuration.
    ///
    /// Model settings are extracted here, so a missing model or temperature
    /// stops the session from starting.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
    ) -> Result<Self, SessionError> {
        let settings = config.model_settings()?;
        let tools = toolchat_tools::enabled_tools(&config.tools)?;
        Self::build(&settings, provider, Arc::new(tools), &config.agent)
    }

    fn build(
        settings: &ModelSettings,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        agent_config: &AgentConfig,
    ) -> Result<Self, SessionError> {
        let model = ChatModel::from_settings(provider, settings)?;
        let agent = FunctionsAgent::from_config(model.clone(), tools, agent_config);
        let id = SessionId::new();

        info!(session_id = %id, model = %settings.model, "Session started");
        Ok(Self {
            id,
            transcript: Transcript::new(),
            agent,
            model,
            phase: TurnPhase::Idle,
        })
    }

    /// Replace the generated id, e.g. with one chosen by the client.
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The recorded turns, oldest first.
    pub fn transcript(&self) -> &[Turn] {
        self.transcript.turns()
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn agent(&self) -> &FunctionsAgent {
        &self.agent
    }

    /// Handle one submitted prompt.
    ///
    /// A blank prompt is ignored (`Ok(None)`). Otherwise the user turn is
    /// recorded first and stays even if a later step fails.
    pub async fn submit(
        &mut self,
        prompt: &str,
        sink: &mut dyn EventSink<SessionEvent>,
    ) -> Result<Option<TurnOutcome>, toolchat_core::Error> {
        self.phase = TurnPhase::AwaitingInput;
        let result = self.run_turn(prompt, sink).await;
        self.phase = TurnPhase::Idle;
        result
    }

    async fn run_turn(
        &mut self,
        prompt: &str,
        sink: &mut dyn EventSink<SessionEvent>,
    ) -> Result<Option<TurnOutcome>, toolchat_core::Error> {
        if prompt.trim().is_empty() {
            debug!(session_id = %self.id, "Ignoring blank prompt");
            return Ok(None);
        }

        self.transcript.push_user(prompt);
        sink.emit(SessionEvent::User(Turn::user(prompt)));
        info!(session_id = %self.id, turn = self.transcript.len(), "Turn accepted");

        self.phase = TurnPhase::AgentRunning;
        let agent_answer = self.agent.run(prompt, &mut AgentEvents::new(sink)).await?;
        sink.emit(SessionEvent::AgentAnswer {
            content: agent_answer.clone(),
        });

        self.phase = TurnPhase::PlainModelRunning;
        let plain_answer = self.model.invoke(prompt).await?;
        self.transcript.push_assistant(plain_answer.clone());
        sink.emit(SessionEvent::Assistant(Turn::assistant(plain_answer.clone())));

        info!(session_id = %self.id, turns = self.transcript.len(), "Turn finished");
        Ok(Some(TurnOutcome {
            agent_answer,
            plain_answer,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolchat_agent::NullSink;
    use toolchat_agent::test_helpers::*;
    use toolchat_core::TurnRole;
    use toolchat_core::error::ProviderError;

    fn settings() -> ModelSettings {
        ModelSettings {
            model: "mock-model".into(),
            temperature: "0.5".into(),
        }
    }

    fn session_with(provider: &Arc<SequentialMockProvider>) -> ChatSession {
        ChatSession::new(
            &settings(),
            provider.clone(),
            Arc::new(ToolRegistry::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn turn_records_plain_answer_not_agent_answer() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("agent says hi"),
            make_text_response("plain says hi"),
        ]));
        let mut session = session_with(&provider);
        let mut events: Vec<SessionEvent> = Vec::new();

        let outcome = session.submit("hello", &mut events).await.unwrap().unwrap();
        assert_eq!(outcome.agent_answer, "agent says hi");
        assert_eq!(outcome.plain_answer, "plain says hi");

        assert_eq!(
            session.transcript(),
            &[Turn::user("hello"), Turn::assistant("plain says hi")]
        );
        assert!(
            session
                .transcript()
                .iter()
                .all(|t| t.content != "agent says hi")
        );
        assert_eq!(session.phase(), TurnPhase::Idle);

        let kinds: Vec<_> = events.iter().map(SessionEvent::event_type).collect();
        assert_eq!(kinds, vec!["user", "chunk", "done", "agent_answer", "assistant"]);
    }

    #[tokio::test]
    async fn plain_call_is_single_message_without_tools() {
        let tool = Arc::new(CountingTool::new("lookup", "unused"));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(SharedTool(tool.clone())));

        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("agent"),
            make_text_response("plain"),
        ]));
        let mut session =
            ChatSession::new(&settings(), provider.clone(), Arc::new(registry)).unwrap();
        session.submit("question", &mut NullSink).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        assert!(requests[1].tools.is_empty());
        assert_eq!(requests[1].messages.len(), 1);
        assert_eq!(requests[1].messages[0].content, "question");
        assert_eq!(requests[1].model, "mock-model");
        assert!((requests[1].temperature - 0.5).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn n_prompts_give_two_n_alternating_turns() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("a1"),
            make_text_response("p1"),
            make_text_response("a2"),
            make_text_response("p2"),
            make_text_response("a3"),
            make_text_response("p3"),
        ]));
        let mut session = session_with(&provider);

        for prompt in ["one", "two", "three"] {
            session.submit(prompt, &mut NullSink).await.unwrap();
        }

        let turns = session.transcript();
        assert_eq!(turns.len(), 6);
        for (i, turn) in turns.iter().enumerate() {
            let expected = if i % 2 == 0 { TurnRole::User } else { TurnRole::Assistant };
            assert_eq!(turn.role, expected);
        }
        assert_eq!(turns[5].content, "p3");
        assert_eq!(session.agent().memory().exchanges(), 3);
    }

    #[tokio::test]
    async fn blank_prompt_is_a_no_op() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let mut session = session_with(&provider);
        let mut events: Vec<SessionEvent> = Vec::new();

        for prompt in ["", "   ", "\n\t"] {
            assert!(session.submit(prompt, &mut events).await.unwrap().is_none());
        }
        assert!(session.transcript().is_empty());
        assert!(events.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn agent_failure_keeps_user_turn() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![Err(
            ProviderError::Network("connection reset".into()),
        )]));
        let mut session = session_with(&provider);

        let err = session.submit("hello", &mut NullSink).await.unwrap_err();
        assert!(matches!(
            err,
            toolchat_core::Error::Provider(ProviderError::Network(_))
        ));
        assert_eq!(session.transcript(), &[Turn::user("hello")]);
        assert_eq!(session.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn plain_call_failure_keeps_user_turn() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![
            Ok(make_text_response("agent answer")),
            Err(ProviderError::ApiError {
                status_code: 500,
                message: "upstream".into(),
            }),
        ]));
        let mut session = session_with(&provider);
        let mut events: Vec<SessionEvent> = Vec::new();

        assert!(session.submit("hello", &mut events).await.is_err());
        assert_eq!(session.transcript(), &[Turn::user("hello")]);
        // The agent answer was still shown before the failure.
        assert!(events.iter().any(|e| matches!(e, SessionEvent::AgentAnswer { .. })));
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Assistant(_))));
    }

    #[test]
    fn bad_temperature_stops_session_start() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let settings = ModelSettings {
            model: "m".into(),
            temperature: "hot".into(),
        };
        let result = ChatSession::new(&settings, provider, Arc::new(ToolRegistry::new()));
        assert!(matches!(
            result,
            Err(SessionError::Setup(toolchat_core::Error::Provider(
                ProviderError::InvalidRequest(_)
            )))
        ));
    }

    #[test]
    fn missing_model_stops_session_start() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let config = AppConfig {
            temperature: Some("0".into()),
            ..AppConfig::default()
        };
        let result = ChatSession::from_config(&config, provider);
        assert!(matches!(
            result,
            Err(SessionError::Config(toolchat_config::ConfigError::Missing(ref v))) if v == "OPENAI_API_MODEL"
        ));
    }

    #[test]
    fn from_config_loads_enabled_tools() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let config = AppConfig {
            model: Some("gpt-4o-mini".into()),
            temperature: Some("0".into()),
            ..AppConfig::default()
        };
        let session = ChatSession::from_config(&config, provider).unwrap();
        assert_eq!(
            session.agent().tools().names(),
            vec!["duckduckgo_search", "wikipedia"]
        );
    }
}
