//! `golem chat`: single-shot or interactive conversation in the terminal.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use golem::agent::{AgentLoop, ToolEvent};
use golem::bus::MessageBus;
use golem::config::Config;

use super::common::{create_agent, warn_if_no_provider};

/// Longest tool argument or result echoed to the terminal.
const PREVIEW_CHARS: usize = 120;

/// Interactive or single-message chat mode.
pub(crate) async fn cmd_chat(message: Option<String>) -> Result<()> {
    let config = Config::load().with_context(|| "Failed to load configuration")?;
    warn_if_no_provider(&config);

    let bus = Arc::new(MessageBus::with_buffer_size(config.bus.capacity));
    let agent = create_agent(&config, bus).await?;
    let printer = spawn_event_printer(&agent);

    if let Some(msg) = message {
        match agent.process_direct(&msg).await {
            Ok(response) => println!("{}", response),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("Golem Interactive Chat");
        println!("Type your message and press Enter. Type 'quit' or 'exit' to stop.");
        println!();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("> ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    println!();
                    break;
                }
                Ok(_) => {
                    let input = input.trim();
                    if input.is_empty() {
                        continue;
                    }
                    if input == "quit" || input == "exit" {
                        println!("Goodbye!");
                        break;
                    }

                    match agent.process_direct(input).await {
                        Ok(response) => {
                            println!();
                            println!("{}", response);
                            println!();
                        }
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            eprintln!();
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    break;
                }
            }
        }
    }

    printer.abort();
    Ok(())
}

/// Echo tool activity to stderr while the agent works.
fn spawn_event_printer(agent: &AgentLoop) -> JoinHandle<()> {
    let mut events = agent.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => eprintln!("{}", describe_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("  ... {} tool events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn describe_event(event: &ToolEvent) -> String {
    match event {
        ToolEvent::Started { name, arguments } => {
            format!("  -> {}({})", name, preview(arguments))
        }
        ToolEvent::Finished {
            name,
            error: Some(error),
            ..
        } => format!("  x  {} failed: {}", name, preview(error)),
        ToolEvent::Finished { name, result, .. } => {
            format!("  <- {}: {}", name, preview(result))
        }
    }
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut)
}
