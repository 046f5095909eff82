//! A provider pinned to one model id and sampling temperature.

use std::sync::Arc;

use toolchat_config::ModelSettings;
use toolchat_core::error::ProviderError;
use toolchat_core::provider::{ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition};
use toolchat_core::{Message, Provider};
use tokio::sync::mpsc;

/// The chat model shared by the agent and the plain answer call.
#[derive(Clone)]
pub struct ChatModel {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl ChatModel {
    /// Bind a provider to a model id.
    ///
    /// The temperature arrives as text (it comes from the environment) and
    /// must parse as a number.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: &str,
    ) -> Result<Self, ProviderError> {
        let temperature: f32 = temperature.trim().parse().map_err(|_| {
            ProviderError::InvalidRequest(format!(
                "temperature must be a number, got '{temperature}'"
            ))
        })?;

        Ok(Self {
            provider,
            model: model.into(),
            temperature,
        })
    }

    pub fn from_settings(
        provider: Arc<dyn Provider>,
        settings: &ModelSettings,
    ) -> Result<Self, ProviderError> {
        Self::new(provider, settings.model.clone(), &settings.temperature)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Build a request against this model.
    pub fn request(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        stream: bool,
    ) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            tools,
            stream,
        }
    }

    pub async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.provider.complete(self.request(messages, tools, false)).await
    }

    pub async fn stream(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Result<mpsc::Receiver<Result<StreamChunk, ProviderError>>, ProviderError> {
        self.provider.stream(self.request(messages, tools, true)).await
    }

    /// Send one user prompt with no history and no tools; return the text.
    pub async fn invoke(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self.complete(vec![Message::user(prompt)], Vec::new()).await?;
        Ok(response.message.content)
    }
}

impl std::fmt::Debug for ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatModel")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use toolchat_core::Role;

    /// Records every request and answers with a fixed text.
    struct RecordingProvider {
        seen: Mutex<Vec<ProviderRequest>>,
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.seen.lock().unwrap().push(request);
            Ok(ProviderResponse {
                message: Message::assistant("plain answer"),
                usage: None,
                model: "mock".into(),
            })
        }
    }

    fn recorder() -> Arc<RecordingProvider> {
        Arc::new(RecordingProvider {
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn parses_numeric_temperature() {
        let model = ChatModel::new(recorder(), "gpt-4o-mini", " 0.7 ").unwrap();
        assert_eq!(model.model(), "gpt-4o-mini");
        assert!((model.temperature() - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_non_numeric_temperature() {
        let err = ChatModel::new(recorder(), "gpt-4o-mini", "warm").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(ref m) if m.contains("warm")));
    }

    #[test]
    fn from_settings_uses_both_fields() {
        let settings = ModelSettings {
            model: "gpt-4o".into(),
            temperature: "0".into(),
        };
        let model = ChatModel::from_settings(recorder(), &settings).unwrap();
        assert_eq!(model.model(), "gpt-4o");
        assert_eq!(model.temperature(), 0.0);
    }

    #[tokio::test]
    async fn invoke_sends_only_the_prompt() {
        let provider = recorder();
        let model = ChatModel::new(provider.clone(), "gpt-4o-mini", "0.2").unwrap();

        let answer = model.invoke("What is up?").await.unwrap();
        assert_eq!(answer, "plain answer");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages.len(), 1);
        assert_eq!(seen[0].messages[0].role, Role::User);
        assert_eq!(seen[0].messages[0].content, "What is up?");
        assert!(seen[0].tools.is_empty());
        assert!(!seen[0].stream);
        assert_eq!(seen[0].model, "gpt-4o-mini");
    }
}
