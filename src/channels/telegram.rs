//! Telegram Channel Implementation
//!
//! This module provides a Telegram bot channel for Golem using the teloxide library.
//! It handles receiving messages from Telegram users and sending responses back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐         ┌──────────────────┐
//! │   Telegram API   │ <────── │  TelegramChannel │
//! │  (long polling)  │ ──────> │   (teloxide)     │
//! └──────────────────┘         └────────┬─────────┘
//!                                       │
//!                                       │ InboundMessage
//!                                       ▼
//!                              ┌──────────────────┐
//!                              │    MessageBus    │
//!                              └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use golem::bus::MessageBus;
//! use golem::config::TelegramConfig;
//! use golem::channels::{Channel, TelegramChannel};
//!
//! let config = TelegramConfig {
//!     enabled: true,
//!     token: "BOT_TOKEN".to_string(),
//!     allow_from: vec![],
//! };
//! let bus = Arc::new(MessageBus::new());
//! let channel = TelegramChannel::new(config, bus);
//! assert_eq!(channel.name(), "telegram");
//! ```

use async_trait::async_trait;
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::bus::{InboundMessage, MessageBus, OutboundMessage};
use crate::config::TelegramConfig;
use crate::error::{GolemError, Result};

use super::{BaseChannelConfig, Channel};

/// Name used for routing and session keys.
pub const TELEGRAM_CHANNEL: &str = "telegram";

/// Maximum number of startup connectivity retries before giving up.
const MAX_STARTUP_RETRIES: u32 = 10;
/// Base delay (in seconds) for exponential backoff on startup retries.
const BASE_RETRY_DELAY_SECS: u64 = 2;
/// Maximum delay (in seconds) for exponential backoff on startup retries.
const MAX_RETRY_DELAY_SECS: u64 = 120;

/// Telegram channel implementation using teloxide.
///
/// This channel connects to Telegram's Bot API to receive and send messages.
/// It supports:
/// - Receiving text messages and captioned media
/// - Sending text responses, as HTML with a plain-text fallback
/// - Allowlist-based access control by user id or username
/// - Graceful shutdown
pub struct TelegramChannel {
    /// Telegram-specific configuration (token, allowlist, etc.)
    config: TelegramConfig,
    /// Base channel configuration (name, allowlist)
    base_config: BaseChannelConfig,
    /// Reference to the message bus for publishing inbound messages
    bus: Arc<MessageBus>,
    /// Shared with the polling task so it can clear the flag on exit.
    running: Arc<AtomicBool>,
    /// Sender to signal shutdown to the polling task
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
    /// Cached bot instance for sending messages
    bot: RwLock<Option<teloxide::Bot>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel with the given configuration.
    pub fn new(config: TelegramConfig, bus: Arc<MessageBus>) -> Self {
        let base_config =
            BaseChannelConfig::with_allowlist(TELEGRAM_CHANNEL, config.allow_from.clone());
        Self {
            config,
            base_config,
            bus,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx: Mutex::new(None),
            bot: RwLock::new(None),
        }
    }

    /// Returns a reference to the Telegram configuration.
    pub fn telegram_config(&self) -> &TelegramConfig {
        &self.config
    }

    /// Returns whether the channel is enabled in configuration.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Calculates the exponential backoff delay for a startup retry attempt.
    fn startup_backoff_delay(attempt: u32) -> Duration {
        let delay_secs = BASE_RETRY_DELAY_SECS
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(MAX_RETRY_DELAY_SECS);
        Duration::from_secs(delay_secs)
    }

    /// Build a Telegram bot client without system proxy detection.
    fn build_bot(token: &str) -> Result<teloxide::Bot> {
        let client = teloxide::net::default_reqwest_settings()
            .no_proxy()
            .build()
            .map_err(|e| {
                GolemError::Channel(format!("Failed to build Telegram HTTP client: {}", e))
            })?;
        Ok(teloxide::Bot::with_client(token.to_string(), client))
    }

    /// Polls `get_me` until it succeeds, retrying transient failures.
    ///
    /// Returns `false` when startup should be abandoned, either because the
    /// error is permanent, retries ran out, or shutdown was requested.
    async fn wait_until_reachable(
        bot: &teloxide::Bot,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> bool {
        use teloxide::prelude::*;
        use teloxide::RequestError;

        let mut attempt: u32 = 0;
        loop {
            let e = match bot.get_me().await {
                Ok(me) => {
                    info!("Telegram bot authenticated as @{}", me.username());
                    return true;
                }
                Err(e) => e,
            };

            let is_transient = matches!(
                &e,
                RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
            );
            if !is_transient || attempt >= MAX_STARTUP_RETRIES {
                error!(
                    "Telegram startup check failed after {} attempt(s): {}",
                    attempt + 1,
                    e
                );
                return false;
            }

            let delay = match &e {
                RequestError::RetryAfter(secs) => secs.duration(),
                _ => Self::startup_backoff_delay(attempt),
            };
            warn!(
                "Telegram startup check failed (attempt {}/{}), retrying in {}s: {}",
                attempt + 1,
                MAX_STARTUP_RETRIES,
                delay.as_secs(),
                e
            );
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Telegram channel shutdown during startup retry");
                    return false;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

/// The parts of a Telegram update the channel cares about.
#[derive(Debug, Clone, Default)]
struct IncomingUpdate {
    user_id: Option<u64>,
    username: Option<String>,
    chat_id: i64,
    message_id: i32,
    text: Option<String>,
    caption: Option<String>,
}

impl IncomingUpdate {
    fn from_message(msg: &teloxide::types::Message) -> Self {
        let user = msg.from.as_ref();
        Self {
            user_id: user.map(|u| u.id.0),
            username: user.and_then(|u| u.username.clone()),
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
            text: msg.text().map(str::to_string),
            caption: msg.caption().map(str::to_string),
        }
    }

    /// `id`, or `id|username` when the user has a username.
    fn sender_id(&self) -> String {
        let id = self
            .user_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        match self.username.as_deref() {
            Some(username) if !username.is_empty() => format!("{}|{}", id, username),
            _ => id,
        }
    }

    /// Converts the update into a bus message.
    ///
    /// Returns `None` when neither text nor caption carries content.
    fn into_inbound(self) -> Option<InboundMessage> {
        let sender_id = self.sender_id();
        let content = self
            .text
            .filter(|t| !t.is_empty())
            .or(self.caption)
            .filter(|c| !c.is_empty())?;

        Some(
            InboundMessage::new(
                TELEGRAM_CHANNEL,
                &sender_id,
                &self.chat_id.to_string(),
                &content,
            )
            .with_metadata("message_id", &self.message_id.to_string())
            .with_metadata("username", self.username.as_deref().unwrap_or_default()),
        )
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        TELEGRAM_CHANNEL
    }

    /// Starts the Telegram bot polling loop.
    ///
    /// This method:
    /// 1. Creates a teloxide Bot instance with the configured token
    /// 2. Spawns a background task that verifies the token and then polls
    /// 3. Returns immediately (non-blocking)
    ///
    /// # Errors
    ///
    /// Returns an error when the token is empty or the HTTP client cannot be
    /// built. Polling errors are logged but don't stop the channel.
    async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("Telegram channel already running");
            return Ok(());
        }

        if !self.config.enabled {
            warn!("Telegram channel is disabled in configuration");
            self.running.store(false, Ordering::SeqCst);
            return Ok(());
        }

        if self.config.token.is_empty() {
            error!("Telegram bot token is empty");
            self.running.store(false, Ordering::SeqCst);
            return Err(GolemError::Config("Telegram bot token is empty".into()));
        }

        let bot = match Self::build_bot(&self.config.token) {
            Ok(bot) => bot,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        info!("Starting Telegram channel");

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.lock().await = Some(shutdown_tx);
        *self.bot.write().await = Some(bot.clone());

        let bus = self.bus.clone();
        let access = self.base_config.clone();
        let running = Arc::clone(&self.running);

        tokio::spawn(async move {
            use teloxide::prelude::*;

            let task_result = std::panic::AssertUnwindSafe(async move {
                if !Self::wait_until_reachable(&bot, &mut shutdown_rx).await {
                    return;
                }

                // dptree injects each dependency separately, not as a tuple
                let handler = Update::filter_message().endpoint(
                    |msg: Message, bus: Arc<MessageBus>, access: BaseChannelConfig| async move {
                        let update = IncomingUpdate::from_message(&msg);
                        let sender_id = update.sender_id();

                        if !access.is_allowed(&sender_id) {
                            info!(
                                "Telegram: sender {} not in allowlist, ignoring message",
                                sender_id
                            );
                            return Ok(());
                        }

                        let chat_id = update.chat_id;
                        match update.into_inbound() {
                            Some(inbound) => {
                                debug!(
                                    sender = %sender_id,
                                    chat_id,
                                    "Telegram: received message"
                                );
                                if let Err(e) = bus.publish_inbound(inbound).await {
                                    error!("Failed to publish inbound message to bus: {}", e);
                                }
                            }
                            None => debug!(chat_id, "Telegram: skipping message without text"),
                        }

                        Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
                    },
                );

                let mut dispatcher = Dispatcher::builder(bot, handler)
                    .dependencies(dptree::deps![bus, access])
                    .build();

                info!("Telegram bot dispatcher started, waiting for messages...");

                tokio::select! {
                    _ = dispatcher.dispatch() => {
                        info!("Telegram dispatcher completed");
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Telegram channel shutdown signal received");
                    }
                }
            })
            .catch_unwind()
            .await;

            if task_result.is_err() {
                error!("Telegram polling task panicked");
            }

            running.store(false, Ordering::SeqCst);
            info!("Telegram polling task stopped");
        });

        Ok(())
    }

    /// Signals the polling task to stop and drops the cached bot.
    async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            info!("Telegram channel already stopped");
            return Ok(());
        }

        info!("Stopping Telegram channel");

        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            if tx.send(()).await.is_err() {
                warn!("Telegram shutdown channel already closed");
            }
        }
        *self.bot.write().await = None;

        info!("Telegram channel stopped");
        Ok(())
    }

    /// Sends an outbound message to a Telegram chat.
    ///
    /// The content is sent with HTML parse mode first. If Telegram rejects
    /// the markup, the same text is sent again without a parse mode.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The channel is not running
    /// - The chat_id cannot be parsed as an integer
    /// - Both send attempts fail
    async fn send(&self, msg: OutboundMessage) -> Result<()> {
        use teloxide::payloads::SendMessageSetters;
        use teloxide::prelude::*;
        use teloxide::types::{ChatId, ParseMode};

        if !self.running.load(Ordering::SeqCst) {
            warn!("Telegram channel not running, cannot send message");
            return Err(GolemError::Channel(
                "Telegram channel not running".to_string(),
            ));
        }

        let chat_id: i64 = msg.chat_id.parse().map_err(|_| {
            GolemError::Channel(format!("Invalid Telegram chat ID: {}", msg.chat_id))
        })?;

        let bot = self
            .bot
            .read()
            .await
            .clone()
            .ok_or_else(|| GolemError::Channel("Telegram bot not initialized".to_string()))?;

        let html = bot
            .send_message(ChatId(chat_id), &msg.content)
            .parse_mode(ParseMode::Html)
            .await;

        if let Err(e) = html {
            debug!("Telegram HTML send failed, retrying as plain text: {}", e);
            bot.send_message(ChatId(chat_id), &msg.content)
                .await
                .map_err(|e| {
                    GolemError::Channel(format!("Failed to send Telegram message: {}", e))
                })?;
        }

        debug!("Telegram: message sent to chat {}", chat_id);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_allowed(&self, user_id: &str) -> bool {
        self.base_config.is_allowed(user_id)
    }
}
