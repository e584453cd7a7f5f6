//! In-process broker.
//!
//! Topics are unbounded tokio channels created by `subscribe`. Each topic has
//! one receiving end shared by every subscriber, so a message is consumed
//! exactly once (queue semantics, like a Kafka consumer group).
//!
//! Publishing to a topic without a live consumer fails with
//! `BrokerError::Delivery`; nothing is queued that nobody will read.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};

use crate::broker::{BrokerError, InboundMessage, OutboundMessage, Publisher, ReplySource};

struct Topic {
    tx: mpsc::UnboundedSender<InboundMessage>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<InboundMessage>>>,
}

impl Topic {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Every `MemoryConsumer` holds a clone of `rx`.
    fn has_consumer(&self) -> bool {
        Arc::strong_count(&self.rx) > 1
    }
}

/// A broker living entirely inside the process.
///
/// Cloning is cheap and every clone sees the same topics.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    topics: Arc<DashMap<String, Topic>>,
    published: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumer for `topic`, creating the topic if needed.
    pub fn subscribe(&self, topic: &str) -> MemoryConsumer {
        let rx = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(Topic::new)
            .rx
            .clone();
        MemoryConsumer {
            topic: topic.to_string(),
            rx,
        }
    }

    /// Total number of messages accepted by `publish`.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }

    /// While set, every publish fails as if the broker were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn deliver(&self, topic: &str, message: InboundMessage) -> Result<(), BrokerError> {
        let no_consumer = || BrokerError::Delivery {
            topic: topic.to_string(),
            reason: "no consumer subscribed".to_string(),
        };

        let entry = self.topics.get(topic).ok_or_else(no_consumer)?;
        if !entry.has_consumer() {
            return Err(no_consumer());
        }
        entry.tx.send(message).map_err(|_| no_consumer())
    }
}

#[async_trait]
impl Publisher for MemoryBroker {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<(), BrokerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BrokerError::Delivery {
                topic: topic.to_string(),
                reason: "broker unavailable".to_string(),
            });
        }

        let inbound = InboundMessage {
            key: message.key,
            headers: message.headers,
            payload: message.payload,
        };
        self.deliver(topic, inbound)?;
        self.published.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(topic = %topic, "Message published in-process");
        Ok(())
    }
}

/// Receiving end of one in-process topic.
#[derive(Clone)]
pub struct MemoryConsumer {
    topic: String,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<InboundMessage>>>,
}

#[async_trait]
impl ReplySource for MemoryConsumer {
    fn name(&self) -> &str {
        &self.topic
    }

    async fn receive_next(&self) -> Result<InboundMessage, BrokerError> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| BrokerError::Closed(self.topic.clone()))
    }
}
