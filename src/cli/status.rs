//! Status command handler.

use anyhow::{Context, Result};

use golem::config::Config;
use golem::providers::{configured_providers, PROVIDER_PRIORITY};

/// Show configuration status.
///
/// Reads the config without creating it, so a fresh home reports the file
/// as missing.
pub(crate) fn cmd_status() -> Result<()> {
    let config_path = Config::path();
    let config =
        Config::load_from_path(&config_path).with_context(|| "Failed to load configuration")?;

    println!("=== Golem Status ===");
    println!();

    println!("Config: {}", config_path.display());
    if config_path.exists() {
        println!("  Status: OK");
    } else {
        println!("  Status: Not found (run 'golem init')");
    }

    println!();
    match config.workspace_path_checked() {
        Ok(workspace) => {
            println!("Workspace: {}", workspace.display());
            if workspace.is_dir() {
                println!("  Status: OK");
            } else {
                println!("  Status: Not found");
            }
        }
        Err(e) => {
            println!("Workspace: invalid");
            println!("  Status: {}", e);
        }
    }

    println!();
    println!("Model: {}", config.agents.defaults.model);

    println!();
    println!("Providers:");
    let configured = configured_providers(&config);
    for name in PROVIDER_PRIORITY {
        let status = if configured.contains(name) {
            "Configured"
        } else {
            "Not configured"
        };
        println!("  {}: {}", name, status);
    }

    println!();
    println!("Channels:");
    let telegram = &config.channels.telegram;
    let telegram_status = if !telegram.enabled {
        "disabled"
    } else if telegram.token.is_empty() {
        "enabled (token not set)"
    } else {
        "enabled"
    };
    println!("  Telegram: {}", telegram_status);

    Ok(())
}
