//! Synchronous round trip over the broker.
//!
//! Publish one command, then wait for its correlated reply, both bounded by
//! the request deadline. Publish and receive are separate failure points so
//! callers can tell "never sent" from "sent but unanswered".

use std::time::{Duration, Instant};

use tokio::time::timeout_at;

use crate::bridge::command::Command;
use crate::bridge::correlation::ReplyChannel;
use crate::broker::{BrokerError, InboundMessage, OutboundMessage, Publisher};
use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;

/// Point in time after which a request's broker work is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(tokio::time::Instant);

impl Deadline {
    pub fn after(ceiling: Duration) -> Self {
        Self(tokio::time::Instant::now() + ceiling)
    }

    pub fn instant(&self) -> tokio::time::Instant {
        self.0
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(tokio::time::Instant::now())
    }
}

/// Publish `command` and wait for its reply on `replies`.
///
/// The reply payload is returned untouched.
pub async fn round_trip(
    publisher: &dyn Publisher,
    command: &Command,
    replies: &ReplyChannel,
    deadline: Deadline,
) -> GatewayResult<InboundMessage> {
    let start = Instant::now();
    let result = exchange(publisher, command, replies, deadline).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::record_round_trip(replies.name(), outcome, start);
    result
}

async fn exchange(
    publisher: &dyn Publisher,
    command: &Command,
    replies: &ReplyChannel,
    deadline: Deadline,
) -> GatewayResult<InboundMessage> {
    // Register first so a fast reply cannot arrive before anyone waits for it.
    let mut pending = replies.register();
    let correlation_id = pending.correlation_id().to_string();
    let message = OutboundMessage::new(command.body.clone()).with_correlation_id(&correlation_id);

    tracing::debug!(
        topic = %command.topic,
        reply_channel = %replies.name(),
        correlation_id = %correlation_id,
        command = %command.body,
        remaining_ms = deadline.remaining().as_millis() as u64,
        "Publishing command"
    );

    match timeout_at(deadline.instant(), publisher.publish(&command.topic, message)).await {
        Ok(Ok(())) => {}
        Ok(Err(source)) => {
            return Err(GatewayError::PublishFailed {
                topic: command.topic.clone(),
                source,
            })
        }
        Err(_) => {
            return Err(GatewayError::PublishFailed {
                topic: command.topic.clone(),
                source: BrokerError::DeadlineElapsed,
            })
        }
    }

    match timeout_at(deadline.instant(), pending.wait()).await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(source)) => Err(GatewayError::ReceiveFailed {
            channel: replies.name().to_string(),
            source,
        }),
        Err(_) => Err(GatewayError::ReceiveTimeout {
            channel: replies.name().to_string(),
        }),
    }
}
