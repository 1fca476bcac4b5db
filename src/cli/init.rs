//! `golem init`: create the config file and seed the workspace.

use std::path::Path;

use anyhow::{Context, Result};

use golem::config::Config;

/// Starter contents for the workspace bootstrap files.
const WORKSPACE_FILES: [(&str, &str); 4] = [
    (
        "IDENTITY.md",
        "# Identity\n\nYou are Golem, a helpful AI assistant.\n",
    ),
    ("SOUL.md", "# Soul\n\nBe helpful, concise, and proactive.\n"),
    ("USER.md", "# User\n\nInformation about the user goes here.\n"),
    (
        "AGENTS.md",
        "# Agents\n\nAgent-specific instructions go here.\n",
    ),
];

/// Initialize configuration and workspace.
pub(crate) fn cmd_init() -> Result<()> {
    let config_path = Config::path();
    if config_path.exists() {
        println!("Config already exists: {}", config_path.display());
        return Ok(());
    }

    let config = Config::default();
    let workspace = config
        .workspace_path_checked()
        .with_context(|| "Invalid workspace")?;

    let dirs = [
        Config::dir(),
        workspace.clone(),
        workspace.join("memory"),
        workspace.join("skills"),
        Config::dir().join("sessions"),
    ];
    for dir in &dirs {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    config
        .save_to_path(&config_path)
        .with_context(|| "Failed to save config")?;
    seed_workspace(&workspace)?;

    println!("Golem initialized!");
    println!("Config: {}", config_path.display());
    println!("Workspace: {}", workspace.display());
    println!();
    println!("Next steps:");
    println!("1. Edit {} to add your API keys", config_path.display());
    println!("2. Run 'golem chat' to start chatting");

    Ok(())
}

/// Write any missing bootstrap file into `workspace`.
///
/// Existing files are left untouched. Returns the names that were written.
pub(crate) fn seed_workspace(workspace: &Path) -> Result<Vec<&'static str>> {
    let mut written = Vec::new();
    for (name, content) in WORKSPACE_FILES {
        let path = workspace.join(name);
        if path.exists() {
            continue;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(name);
    }
    Ok(written)
}
