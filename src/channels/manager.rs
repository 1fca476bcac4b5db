//! Channel Manager for Golem
//!
//! This module provides the `ChannelManager` which is responsible for:
//! - Registering and managing multiple communication channels
//! - Starting and stopping all channels
//! - Routing outbound messages to the appropriate channels

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bus::{MessageBus, OutboundMessage};
use crate::error::{GolemError, Result};

use super::Channel;

type ChannelMap = Arc<RwLock<HashMap<String, Arc<dyn Channel>>>>;

/// How long `stop_all` waits for background tasks before abandoning them
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// The `ChannelManager` manages the lifecycle of all communication channels.
///
/// It provides methods to:
/// - Register new channels
/// - Start and stop all channels
/// - Route outbound messages to the correct channel
/// - List all registered channels
///
/// # Architecture
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                     ChannelManager                          │
/// │                                                             │
/// │    ┌──────────┐  ┌──────────┐                               │
/// │    │ Telegram │  │   ...    │   one start task per channel  │
/// │    └────┬─────┘  └────┬─────┘                               │
/// │         │   send()    │                                     │
/// │         └──────┬──────┘                                     │
/// │          ┌─────┴─────┐                                      │
/// │          │  router   │ <── MessageBus (outbound)            │
/// │          └───────────┘                                      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// Each routed send runs in its own task, so a slow platform never delays
/// delivery to another. Sends are not retried. Messages for a channel that
/// is not registered are logged and dropped.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use golem::bus::MessageBus;
/// use golem::channels::ChannelManager;
///
/// # tokio_test::block_on(async {
/// let bus = Arc::new(MessageBus::new());
/// let manager = ChannelManager::new(bus);
///
/// // manager.register(Arc::new(telegram_channel)).await?;
/// manager.start_all().await;
/// manager.spawn_router().await;
///
/// assert!(manager.channels().await.is_empty());
/// manager.stop_all().await;
/// # })
/// ```
pub struct ChannelManager {
    /// Map of channel name to channel instance
    channels: ChannelMap,
    /// Reference to the message bus for routing
    bus: Arc<MessageBus>,
    /// Shutdown signal sender for the router
    shutdown_tx: watch::Sender<bool>,
    /// Handle to the router task (if running)
    router_handle: Mutex<Option<JoinHandle<()>>>,
    /// Handles of the per-channel start tasks
    start_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ChannelManager {
    /// Creates a new `ChannelManager` routing through `bus`.
    pub fn new(bus: Arc<MessageBus>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            bus,
            shutdown_tx,
            router_handle: Mutex::new(None),
            start_handles: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new channel with the manager.
    ///
    /// # Errors
    ///
    /// Returns `GolemError::Channel` if a channel with the same name is
    /// already registered. The existing channel is kept.
    pub async fn register(&self, channel: Arc<dyn Channel>) -> Result<()> {
        let name = channel.name().to_string();
        let mut channels = self.channels.write().await;
        if channels.contains_key(&name) {
            return Err(GolemError::Channel(format!(
                "channel already registered: {}",
                name
            )));
        }
        info!("Registering channel: {}", name);
        channels.insert(name, channel);
        Ok(())
    }

    /// Returns the names of all registered channels, sorted.
    pub async fn channels(&self) -> Vec<String> {
        let channels = self.channels.read().await;
        let mut names: Vec<String> = channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered channels.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Checks if a channel with the given name is registered.
    pub async fn has_channel(&self, name: &str) -> bool {
        self.channels.read().await.contains_key(name)
    }

    /// Starts every registered channel, each in its own task.
    ///
    /// A channel that fails to start is logged and does not affect the
    /// others.
    pub async fn start_all(&self) {
        let channels: Vec<Arc<dyn Channel>> =
            self.channels.read().await.values().cloned().collect();

        let mut handles = self.start_handles.lock().await;
        for channel in channels {
            let handle = tokio::spawn(async move {
                let name = channel.name().to_string();
                info!("Starting channel: {}", name);
                if let Err(e) = channel.start().await {
                    error!("Failed to start channel {}: {}", name, e);
                }
            });
            handles.push(handle);
        }
    }

    /// Routes outbound messages until `stop_all` is called or the bus closes.
    ///
    /// Most callers want [`spawn_router`](Self::spawn_router) instead.
    pub async fn route_outbound(&self) {
        dispatch_outbound(
            self.bus.clone(),
            self.channels.clone(),
            self.shutdown_tx.subscribe(),
        )
        .await;
    }

    /// Runs the outbound router in a background task.
    ///
    /// Calling this while a router is already running does nothing.
    pub async fn spawn_router(&self) {
        let mut router = self.router_handle.lock().await;
        if let Some(ref handle) = *router {
            if !handle.is_finished() {
                warn!("Outbound router already running, skipping start");
                return;
            }
        }

        // Reset the signal in case of a restart after stop_all.
        self.shutdown_tx.send_replace(false);

        let bus = self.bus.clone();
        let channels = self.channels.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        *router = Some(tokio::spawn(async move {
            dispatch_outbound(bus, channels, shutdown_rx).await;
        }));
    }

    /// Stops the router, then every registered channel.
    ///
    /// Best effort: failures are logged, never returned.
    pub async fn stop_all(&self) {
        info!("Signaling outbound router to stop");
        self.shutdown_tx.send_replace(true);

        if let Some(handle) = self.router_handle.lock().await.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(_) => info!("Outbound router stopped cleanly"),
                Err(_) => warn!("Outbound router did not stop within timeout"),
            }
        }

        let channels: Vec<Arc<dyn Channel>> =
            self.channels.read().await.values().cloned().collect();
        for channel in channels {
            info!("Stopping channel: {}", channel.name());
            if let Err(e) = channel.stop().await {
                error!("Failed to stop channel {}: {}", channel.name(), e);
            }
        }

        for handle in self.start_handles.lock().await.drain(..) {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                warn!("Channel start task did not finish within timeout");
            }
        }
    }

    /// Sends a message to a specific channel, waiting for the result.
    ///
    /// If the channel is not found, a warning is logged and `Ok(())` is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the channel's error if the send fails.
    pub async fn send(&self, channel_name: &str, msg: OutboundMessage) -> Result<()> {
        let channel = self.channels.read().await.get(channel_name).cloned();
        match channel {
            Some(channel) => channel.send(msg).await,
            None => {
                warn!("Channel not found: {}", channel_name);
                Ok(())
            }
        }
    }

    /// Returns a reference to the message bus.
    pub fn bus(&self) -> Arc<MessageBus> {
        self.bus.clone()
    }
}

/// Background loop that dispatches outbound messages from the bus to channels.
///
/// The channel lock is held only for the lookup; the send itself runs in a
/// detached task.
async fn dispatch_outbound(
    bus: Arc<MessageBus>,
    channels: ChannelMap,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("Outbound router started");

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Outbound router received shutdown signal");
                    break;
                }
            }
            msg = bus.consume_outbound() => {
                let Some(msg) = msg else {
                    info!("Outbound channel closed");
                    break;
                };
                let channel = channels.read().await.get(&msg.channel).cloned();
                match channel {
                    Some(channel) => {
                        debug!(channel = %msg.channel, chat_id = %msg.chat_id, "Routing outbound message");
                        tokio::spawn(async move {
                            let name = msg.channel.clone();
                            if let Err(e) = channel.send(msg).await {
                                error!("Failed to send message to {}: {}", name, e);
                            }
                        });
                    }
                    None => {
                        crate::log_component!(
                            warn,
                            "channels",
                            "Unknown channel for outbound message, dropping",
                            channel = msg.channel.as_str(),
                            chat_id = msg.chat_id.as_str(),
                        );
                    }
                }
            }
        }
    }

    info!("Outbound router stopped");
}
