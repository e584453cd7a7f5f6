//! Message broker boundary.
//!
//! # Data Flow
//! ```text
//! bridge::round_trip
//!     → Publisher::publish(topic, OutboundMessage)   (command out)
//!
//! bridge::correlation::ReplyChannel pump
//!     ← ReplySource::receive_next()                 (reply in)
//! ```
//!
//! # Design Decisions
//! - The gateway only needs "publish" and "receive next"; everything else
//!   about the broker stays behind these two traits
//! - Messages carry an optional key and string headers so correlation ids and
//!   reply kinds survive any binding
//! - `memory.rs` is always available; `kafka.rs` is behind the `kafka` feature

pub mod memory;

#[cfg(feature = "kafka")]
pub mod kafka;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Header carrying the correlation id of a command and of its reply.
pub const CORRELATION_HEADER: &str = "correlation-id";

/// Header a backend may set on a reply to declare its kind.
pub const KIND_HEADER: &str = "kind";

/// Transport-level broker failures.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// The broker refused or failed to deliver a message.
    #[error("delivery to '{topic}' failed: {reason}")]
    Delivery { topic: String, reason: String },

    /// Reading from a consumer failed.
    #[error("consume from '{topic}' failed: {reason}")]
    Consume { topic: String, reason: String },

    /// The channel has no more messages and never will.
    #[error("channel '{0}' is closed")]
    Closed(String),

    /// The operation did not finish before its deadline.
    #[error("deadline elapsed")]
    DeadlineElapsed,
}

/// A message published by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub key: Option<String>,
    pub headers: Vec<(String, String)>,
    pub payload: Bytes,
}

impl OutboundMessage {
    /// A message with a payload and nothing else.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            key: None,
            headers: Vec::new(),
            payload: payload.into(),
        }
    }

    /// Tag the message with a correlation id (key and header).
    pub fn with_correlation_id(mut self, id: &str) -> Self {
        self.key = Some(id.to_string());
        self.with_header(CORRELATION_HEADER, id)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A message consumed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub key: Option<String>,
    pub headers: Vec<(String, String)>,
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            key: None,
            headers: Vec::new(),
            payload: payload.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Correlation id from the header, falling back to the message key.
    pub fn correlation_id(&self) -> Option<&str> {
        self.header(CORRELATION_HEADER).or(self.key.as_deref())
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Sends commands to broker topics.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<(), BrokerError>;
}

/// One inbound consumption stream.
///
/// `receive_next` must be cancel-safe: dropping the future must not lose a
/// message that was not yet returned.
#[async_trait]
pub trait ReplySource: Send + Sync {
    /// Topic (or other name) the source consumes, for logs and metrics.
    fn name(&self) -> &str;

    async fn receive_next(&self) -> Result<InboundMessage, BrokerError>;
}
