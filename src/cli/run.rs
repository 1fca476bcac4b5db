//! `golem run`: the long-running server (agent loop plus channels).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use golem::bus::MessageBus;
use golem::channels::{ChannelManager, TelegramChannel};
use golem::config::Config;

use super::common::create_agent;

/// How long to wait for the agent loop to finish its current message.
const AGENT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Start the agent server.
pub(crate) async fn cmd_run(port: Option<u16>) -> Result<()> {
    let mut config = Config::load().with_context(|| "Failed to load configuration")?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let bus = Arc::new(MessageBus::with_buffer_size(config.bus.capacity));

    let agent = create_agent(&config, bus.clone()).await?;
    if !agent.has_model() {
        warn!("No model configured; every message will be answered with a notice");
    }

    let agent_task = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move {
            if let Err(e) = agent.run().await {
                error!("Agent loop error: {}", e);
            }
        })
    };

    let channel_manager = ChannelManager::new(bus.clone());
    if config.channels.telegram.enabled {
        let telegram = TelegramChannel::new(config.channels.telegram.clone(), bus.clone());
        channel_manager
            .register(Arc::new(telegram))
            .await
            .with_context(|| "Failed to register Telegram channel")?;
    }

    let channel_count = channel_manager.channel_count().await;
    if channel_count == 0 {
        warn!(
            "No channels enabled. Enable channels in {:?}",
            Config::path()
        );
    } else {
        info!("Registered {} channel(s)", channel_count);
    }

    channel_manager.start_all().await;
    channel_manager.spawn_router().await;

    info!(
        host = %config.gateway.host,
        port = config.gateway.port,
        "Golem server running"
    );
    println!("Golem server running. Press Ctrl+C to stop.");

    shutdown_signal()
        .await
        .with_context(|| "Failed to listen for shutdown signal")?;

    println!();
    println!("Shutting down...");

    agent.stop();
    channel_manager.stop_all().await;
    bus.close();

    if tokio::time::timeout(AGENT_STOP_TIMEOUT, agent_task)
        .await
        .is_err()
    {
        warn!("Agent loop did not stop within timeout");
    }

    println!("Golem stopped.");
    Ok(())
}

/// Resolves on Ctrl+C, or on SIGTERM where signals exist.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => {
                info!("Received SIGTERM");
                Ok(())
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
