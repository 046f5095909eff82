//! `toolchat tools`: list the tools the agent may call.

use std::path::Path;

use toolchat_config::AppConfig;

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = toolchat_tools::enabled_tools(&config.tools)?;

    if registry.is_empty() {
        println!("No tools enabled.");
        return Ok(());
    }

    for name in registry.names() {
        let description = registry.get(name).map(|t| t.description()).unwrap_or("");
        println!("  {name:<20} {description}");
    }

    Ok(())
}
