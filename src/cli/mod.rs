//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod chat;
pub mod common;
pub mod init;
pub mod run;
pub mod status;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use golem::config::Config;

#[derive(Parser)]
#[command(name = "golem")]
#[command(version)]
#[command(about = "Personal AI assistant for chat platforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and workspace
    Init,
    /// Chat with the agent (interactive unless a message is given)
    Chat {
        /// Message to process in single-shot mode
        message: Option<String>,
    },
    /// Start the agent server with all enabled channels
    Run {
        /// Server port (overrides gateway.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show configuration status
    Status,
    /// Show version information
    Version,
}

/// Entry point for the CLI, called from main().
pub async fn run() -> Result<()> {
    // Read the file without writing defaults so `init` still sees a fresh home.
    let logging_cfg = Config::load_from_path(&Config::path())
        .map(|c| c.logging)
        .unwrap_or_default();
    if let Err(e) = golem::utils::init_logging(&logging_cfg) {
        eprintln!("Warning: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Init) => {
            init::cmd_init()?;
        }
        Some(Commands::Chat { message }) => {
            chat::cmd_chat(message).await?;
        }
        Some(Commands::Run { port }) => {
            run::cmd_run(port).await?;
        }
        Some(Commands::Status) => {
            status::cmd_status()?;
        }
        Some(Commands::Version) => {
            cmd_version();
        }
    }

    Ok(())
}

/// Display version information
fn cmd_version() {
    println!("golem {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Personal AI assistant for chat platforms");
}
