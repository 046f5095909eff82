use thiserror::Error;
use toolchat_config::ConfigError;
use toolchat_core::error::{ProviderError, ToolError};

/// Why a session could not be started.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Model settings or other configuration are missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The model client or tool set could not be built.
    #[error(transparent)]
    Setup(#[from] toolchat_core::Error),
}

impl From<ProviderError> for SessionError {
    fn from(e: ProviderError) -> Self {
        Self::Setup(e.into())
    }
}

impl From<ToolError> for SessionError {
    fn from(e: ToolError) -> Self {
        Self::Setup(e.into())
    }
}
