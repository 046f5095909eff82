//! Tools the toolchat agent may call.
//!
//! Two are built in: a DuckDuckGo search and a Wikipedia lookup. Both take a
//! single `query` string and answer with plain text. [`load_tools`] turns the
//! configured tool names into a [`ToolRegistry`].

pub mod web_search;
pub mod wikipedia;

pub use web_search::DuckDuckGoSearchTool;
pub use wikipedia::WikipediaTool;

use std::time::Duration;

use toolchat_config::{TOOL_DDG_SEARCH, TOOL_WIKIPEDIA, ToolsConfig};
use toolchat_core::error::ToolError;
use toolchat_core::tool::{Tool, ToolRegistry};
use tracing::warn;

/// Names accepted by [`load_tools`].
pub const KNOWN_TOOLS: &[&str] = &[TOOL_DDG_SEARCH, TOOL_WIKIPEDIA];

/// Build a registry holding the named tools.
///
/// Names are config names (`ddg-search`), not the names the model sees.
/// An unknown name is an error.
pub fn load_tools<S: AsRef<str>>(
    names: &[S],
    config: &ToolsConfig,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    for name in names {
        let tool: Box<dyn Tool> = match name.as_ref() {
            TOOL_DDG_SEARCH => Box::new(DuckDuckGoSearchTool::new(&config.search)),
            TOOL_WIKIPEDIA => Box::new(WikipediaTool::new(&config.wikipedia)),
            other => return Err(ToolError::NotFound(other.to_string())),
        };
        registry.register(tool);
    }
    Ok(registry)
}

/// Registry for the tools enabled in the configuration.
pub fn enabled_tools(config: &ToolsConfig) -> Result<ToolRegistry, ToolError> {
    load_tools(config.enabled.as_slice(), config)
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("toolchat/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

fn query_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The search query"
            }
        },
        "required": ["query"]
    })
}

fn query_argument(arguments: &serde_json::Value) -> Result<&str, ToolError> {
    arguments["query"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))
}

fn request_failed(tool_name: &str, e: reqwest::Error) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool_name.into(),
        reason: e.to_string(),
    }
}
