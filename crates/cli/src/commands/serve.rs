//! `toolchat serve`: start the chat page and session API.

use std::path::Path;

use toolchat_config::AppConfig;

pub async fn run(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    println!("toolchat");
    println!("   Page:      http://{}:{}/", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model.as_deref().unwrap_or("(unset)"));
    println!("   Tools:     {}", config.tools.enabled.join(", "));

    toolchat_gateway::start(config).await?;

    Ok(())
}
