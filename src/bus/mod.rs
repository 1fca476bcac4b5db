//! Message Bus Module
//!
//! This module provides the message bus that decouples chat surfaces from the
//! agent. The `MessageBus` carries inbound messages (from channels to the
//! agent) and outbound messages (from the agent back to channels) over two
//! independent bounded queues.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Channel   │────>│  MessageBus │────>│  AgentLoop  │
//! │  (Telegram) │     │  (inbound)  │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            │ outbound
//!                            ▼
//! ┌─────────────┐     ┌─────────────┐
//! │   Channel   │<────│  MessageBus │
//! │  (Telegram) │     │  (outbound) │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use golem::bus::{MessageBus, InboundMessage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = MessageBus::new();
//!
//!     let msg = InboundMessage::new("telegram", "user123", "chat456", "Hello");
//!     bus.publish_inbound(msg).await.unwrap();
//!
//!     if let Some(received) = bus.consume_inbound().await {
//!         println!("Received: {}", received.content);
//!     }
//! }
//! ```

pub mod message;

pub use message::{session_key, InboundMessage, OutboundMessage};

use crate::error::{GolemError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// Default capacity of each queue
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// The central message bus for routing messages between channels and the agent.
///
/// Both queues are bounded: publishing to a full queue waits until the
/// consumer catches up, so a slow agent throttles fast producers instead of
/// dropping messages. Ordering is FIFO per queue.
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Arc<Mutex<mpsc::Receiver<InboundMessage>>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: Arc<Mutex<mpsc::Receiver<OutboundMessage>>>,
    /// Set once by `close()`
    closed: Arc<watch::Sender<bool>>,
}

impl MessageBus {
    /// Creates a new `MessageBus` with the default capacity (100) per queue.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Creates a new `MessageBus` with a custom capacity per queue.
    ///
    /// # Example
    /// ```
    /// use golem::bus::MessageBus;
    ///
    /// let bus = MessageBus::with_buffer_size(500);
    /// assert!(!bus.is_closed());
    /// ```
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer_size.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer_size.max(1));
        let (closed, _) = watch::channel(false);

        Self {
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(outbound_rx)),
            closed: Arc::new(closed),
        }
    }

    /// Publishes an inbound message, waiting while the queue is full.
    ///
    /// # Errors
    /// Returns `GolemError::BusClosed` once the bus has been closed.
    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<()> {
        if self.is_closed() {
            return Err(GolemError::BusClosed);
        }
        self.inbound_tx
            .send(msg)
            .await
            .map_err(|_| GolemError::BusClosed)
    }

    /// Consumes the next inbound message.
    ///
    /// Waits while the queue is empty. After `close()`, messages still
    /// buffered are drained and then `None` is returned.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.lock().await;
        recv_until_closed(&mut rx, &self.closed).await
    }

    /// Publishes an outbound message, waiting while the queue is full.
    ///
    /// # Errors
    /// Returns `GolemError::BusClosed` once the bus has been closed.
    pub async fn publish_outbound(&self, msg: OutboundMessage) -> Result<()> {
        if self.is_closed() {
            return Err(GolemError::BusClosed);
        }
        self.outbound_tx
            .send(msg)
            .await
            .map_err(|_| GolemError::BusClosed)
    }

    /// Consumes the next outbound message. Same end-of-stream rules as
    /// [`MessageBus::consume_inbound`].
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        let mut rx = self.outbound_rx.lock().await;
        recv_until_closed(&mut rx, &self.closed).await
    }

    /// Closes both queues.
    ///
    /// Later publishes fail with `BusClosed`; pending and future consumers
    /// drain what is buffered and then observe `None`. Producers must be
    /// stopped before the bus is closed.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

async fn recv_until_closed<T>(
    rx: &mut mpsc::Receiver<T>,
    closed: &watch::Sender<bool>,
) -> Option<T> {
    let mut closed_rx = closed.subscribe();
    if *closed_rx.borrow_and_update() {
        return rx.try_recv().ok();
    }
    tokio::select! {
        biased;
        msg = rx.recv() => msg,
        _ = closed_rx.wait_for(|closed| *closed) => rx.try_recv().ok(),
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MessageBus {
    /// Clones the message bus, sharing the same underlying queues.
    fn clone(&self) -> Self {
        Self {
            inbound_tx: self.inbound_tx.clone(),
            inbound_rx: Arc::clone(&self.inbound_rx),
            outbound_tx: self.outbound_tx.clone(),
            outbound_rx: Arc::clone(&self.outbound_rx),
            closed: Arc::clone(&self.closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bus_inbound_flow() {
        let bus = MessageBus::new();
        let msg = InboundMessage::new("telegram", "user123", "chat456", "Hello");

        bus.publish_inbound(msg).await.unwrap();
        let received = bus.consume_inbound().await.unwrap();

        assert_eq!(received.content, "Hello");
        assert_eq!(received.channel, "telegram");
        assert_eq!(received.sender_id, "user123");
        assert_eq!(received.chat_id, "chat456");
    }

    #[tokio::test]
    async fn test_bus_outbound_flow() {
        let bus = MessageBus::new();
        let msg = OutboundMessage::new("telegram", "chat456", "Response");

        bus.publish_outbound(msg).await.unwrap();
        let received = bus.consume_outbound().await.unwrap();

        assert_eq!(received.content, "Response");
        assert_eq!(received.channel, "telegram");
    }

    #[tokio::test]
    async fn test_bus_fifo_order() {
        let bus = MessageBus::new();

        for i in 0..5 {
            let msg = InboundMessage::new("telegram", "user", "chat", &format!("Message {}", i));
            bus.publish_inbound(msg).await.unwrap();
        }

        for i in 0..5 {
            let received = bus.consume_inbound().await.unwrap();
            assert_eq!(received.content, format!("Message {}", i));
        }
    }

    #[tokio::test]
    async fn test_queues_are_independent() {
        let bus = MessageBus::new();
        bus.publish_outbound(OutboundMessage::new("cli", "direct", "out"))
            .await
            .unwrap();
        bus.publish_inbound(InboundMessage::new("cli", "user", "direct", "in"))
            .await
            .unwrap();

        assert_eq!(bus.consume_inbound().await.unwrap().content, "in");
        assert_eq!(bus.consume_outbound().await.unwrap().content, "out");
    }

    #[tokio::test]
    async fn test_publish_blocks_when_full() {
        let bus = Arc::new(MessageBus::with_buffer_size(1));
        bus.publish_inbound(InboundMessage::new("t", "u", "c", "first"))
            .await
            .unwrap();

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            bus.publish_inbound(InboundMessage::new("t", "u", "c", "second")),
        )
        .await;
        assert!(blocked.is_err(), "publish should wait on a full queue");

        let producer = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                bus.publish_inbound(InboundMessage::new("t", "u", "c", "third"))
                    .await
            })
        };
        assert_eq!(bus.consume_inbound().await.unwrap().content, "first");
        producer.await.unwrap().unwrap();
        assert_eq!(bus.consume_inbound().await.unwrap().content, "third");
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let bus = Arc::new(MessageBus::new());
        let bus_clone = Arc::clone(&bus);

        let producer = tokio::spawn(async move {
            for i in 0..10 {
                let msg = InboundMessage::new("test", "user", "chat", &format!("Msg {}", i));
                bus_clone.publish_inbound(msg).await.unwrap();
            }
        });

        let bus_clone2 = Arc::clone(&bus);
        let consumer = tokio::spawn(async move {
            let mut count = 0;
            while count < 10 {
                if bus_clone2.consume_inbound().await.is_some() {
                    count += 1;
                }
            }
            count
        });

        producer.await.unwrap();
        assert_eq!(consumer.await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_close_rejects_publish() {
        let bus = MessageBus::new();
        bus.close();

        let result = bus
            .publish_inbound(InboundMessage::new("t", "u", "c", "late"))
            .await;
        assert!(matches!(result, Err(GolemError::BusClosed)));

        let result = bus
            .publish_outbound(OutboundMessage::new("t", "c", "late"))
            .await;
        assert!(matches!(result, Err(GolemError::BusClosed)));
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let bus = MessageBus::new();
        bus.publish_inbound(InboundMessage::new("t", "u", "c", "buffered"))
            .await
            .unwrap();
        bus.close();

        assert_eq!(bus.consume_inbound().await.unwrap().content, "buffered");
        assert!(bus.consume_inbound().await.is_none());
    }

    #[tokio::test]
    async fn test_close_wakes_pending_consumer() {
        let bus = Arc::new(MessageBus::new());
        let waiter = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move { bus.consume_outbound().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        bus.close();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("consumer should wake on close")
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_clone_shares_queues() {
        let bus1 = MessageBus::new();
        let bus2 = bus1.clone();

        bus1.publish_inbound(InboundMessage::new("t", "u", "c", "shared"))
            .await
            .unwrap();
        assert_eq!(bus2.consume_inbound().await.unwrap().content, "shared");

        bus2.close();
        assert!(bus1.is_closed());
    }
}
