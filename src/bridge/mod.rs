//! Synchronous bridge between HTTP and the broker.
//!
//! # Data Flow
//! ```text
//! query parameters
//!     → command.rs (command string + outbound topic + reply route)
//!     → round_trip.rs (register waiter, publish, wait until deadline)
//!         ↔ correlation.rs (reply pump resolves the waiter)
//!     → aggregate.rs (two round trips joined, composite endpoint only)
//!     → classify.rs (assign replies to news / comments)
//! ```
//!
//! # Design Decisions
//! - Every publish and every reply wait of a request shares one deadline
//! - Replies are matched to commands by correlation id, not by arrival order
//! - One publish and one reply wait per leg; nothing is retried here

pub mod aggregate;
pub mod classify;
pub mod command;
pub mod correlation;
pub mod round_trip;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::broker::{BrokerError, InboundMessage, Publisher};
use crate::error::{GatewayError, GatewayResult};

pub use classify::FinalResponse;
pub use command::{Command, CommandEncoder, ReplyRoute};
pub use correlation::ReplyChannel;
pub use round_trip::{round_trip, Deadline};

/// Publisher plus the reply channel of every route.
pub struct Bridge {
    publisher: Arc<dyn Publisher>,
    channels: HashMap<ReplyRoute, Arc<ReplyChannel>>,
    ceiling: Duration,
}

impl Bridge {
    /// `ceiling` bounds every round trip started through this bridge.
    pub fn new(publisher: Arc<dyn Publisher>, ceiling: Duration) -> Self {
        Self {
            publisher,
            channels: HashMap::new(),
            ceiling,
        }
    }

    /// Route replies of `route` through `channel`.
    pub fn with_channel(mut self, route: ReplyRoute, channel: Arc<ReplyChannel>) -> Self {
        self.channels.insert(route, channel);
        self
    }

    /// Deadline for a request starting now.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.ceiling)
    }

    pub fn channel(&self, route: ReplyRoute) -> Option<&Arc<ReplyChannel>> {
        self.channels.get(&route)
    }

    /// Run one round trip for `command` on the channel of its reply route.
    pub async fn call(&self, command: &Command, deadline: Deadline) -> GatewayResult<InboundMessage> {
        let Some(channel) = self.channels.get(&command.reply) else {
            tracing::error!(route = ?command.reply, "No reply channel configured for route");
            return Err(GatewayError::ReceiveFailed {
                channel: format!("{:?}", command.reply),
                source: BrokerError::Closed(format!("{:?}", command.reply)),
            });
        };
        round_trip(self.publisher.as_ref(), command, channel, deadline).await
    }
}
