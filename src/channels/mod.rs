//! Channels module - Communication channels (Telegram, ...)
//!
//! Channels receive messages from users, publish them to the message bus,
//! and deliver the agent's replies back to the platform they came from.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ChannelManager              │
//! │                                          │
//! │   ┌──────────┐   ┌──────────┐            │
//! │   │ Telegram │   │   ...    │            │
//! │   └────┬─────┘   └────┬─────┘            │
//! │        │  implements  │                  │
//! │        │   Channel    │                  │
//! │        └──────┬───────┘                  │
//! │         ┌─────┴─────┐                    │
//! │         │MessageBus │                    │
//! │         │ (inbound/ │                    │
//! │         │ outbound) │                    │
//! │         └───────────┘                    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! New platforms implement [`Channel`]; see its docs for a minimal adapter.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use golem::bus::MessageBus;
//! use golem::channels::{ChannelManager, TelegramChannel};
//! use golem::config::Config;
//!
//! # tokio_test::block_on(async {
//! let bus = Arc::new(MessageBus::new());
//! let config = Config::default();
//! let manager = ChannelManager::new(bus.clone());
//!
//! let telegram = TelegramChannel::new(config.channels.telegram.clone(), bus);
//! manager.register(Arc::new(telegram)).await.unwrap();
//! assert!(manager.has_channel("telegram").await);
//! # })
//! ```

mod manager;
pub mod telegram;
mod types;

pub use manager::ChannelManager;
pub use telegram::TelegramChannel;
pub use types::{BaseChannelConfig, Channel};
