//! LLM provider client and chat-model binding for toolchat.
//!
//! [`OpenAiCompatProvider`] implements `toolchat_core::Provider` over the
//! `/chat/completions` endpoint. [`ChatModel`] pins a provider to one model id
//! and temperature, which is what the agent and the plain chat call share.

pub mod chat_model;
pub mod openai_compat;

pub use chat_model::ChatModel;
pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;
use toolchat_config::AppConfig;
use toolchat_core::Provider;

/// Build the provider described by the configuration.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let api_key = config.api_key.clone().unwrap_or_default();
    Arc::new(OpenAiCompatProvider::new("openai", &config.api_base, api_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_openai_provider_from_defaults() {
        let provider = build_from_config(&AppConfig::default());
        assert_eq!(provider.name(), "openai");
    }
}
