//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect the configured broker binding
//! - Start one reply pump per distinct inbound topic
//! - Assemble the bridge the HTTP handlers run on
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Routes configured with the same reply topic share one pump

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::bridge::{Bridge, ReplyChannel, ReplyRoute};
use crate::broker::memory::MemoryBroker;
use crate::broker::{Publisher, ReplySource};
use crate::config::{BrokerKind, GatewayConfig};
use crate::lifecycle::shutdown::Shutdown;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("broker kind '{0}' is not compiled into this binary (enable the `{0}` feature)")]
    BindingUnavailable(&'static str),

    #[error("failed to connect to broker: {0}")]
    Broker(String),
}

/// Build the bridge over an existing publisher, opening reply sources with
/// `open_source`.
pub fn build_bridge<F>(
    config: &GatewayConfig,
    publisher: Arc<dyn Publisher>,
    mut open_source: F,
    shutdown: &Shutdown,
) -> Result<Bridge, StartupError>
where
    F: FnMut(&str) -> Result<Arc<dyn ReplySource>, StartupError>,
{
    let topics = &config.broker.topics;
    let mut bridge = Bridge::new(
        publisher,
        Duration::from_secs(config.timeouts.round_trip_secs),
    );
    let mut channels: HashMap<&str, Arc<ReplyChannel>> = HashMap::new();

    for route in ReplyRoute::ALL {
        let topic = route.topic(topics);
        let channel = match channels.get(topic) {
            Some(channel) => channel.clone(),
            None => {
                let channel = ReplyChannel::spawn(open_source(topic)?, shutdown.subscribe());
                tracing::info!(topic = %topic, "Reply pump started");
                channels.insert(topic, channel.clone());
                channel
            }
        };
        bridge = bridge.with_channel(route, channel);
    }

    Ok(bridge)
}

/// Connect the broker named in the config and build the bridge over it.
pub fn connect(config: &GatewayConfig, shutdown: &Shutdown) -> Result<Bridge, StartupError> {
    match config.broker.kind {
        BrokerKind::Memory => {
            tracing::warn!("Using the in-process broker; no backend services are attached");
            let broker = MemoryBroker::new();
            let consumer_side = broker.clone();
            build_bridge(
                config,
                Arc::new(broker),
                move |topic| Ok(Arc::new(consumer_side.subscribe(topic)) as Arc<dyn ReplySource>),
                shutdown,
            )
        }
        BrokerKind::Kafka => connect_kafka(config, shutdown),
    }
}

#[cfg(feature = "kafka")]
fn connect_kafka(config: &GatewayConfig, shutdown: &Shutdown) -> Result<Bridge, StartupError> {
    use crate::broker::kafka::{KafkaPublisher, KafkaReplySource};

    let publisher = KafkaPublisher::new(&config.broker)
        .map_err(|e| StartupError::Broker(e.to_string()))?;
    build_bridge(
        config,
        Arc::new(publisher),
        |topic| {
            KafkaReplySource::new(&config.broker, topic)
                .map(|source| Arc::new(source) as Arc<dyn ReplySource>)
                .map_err(|e| StartupError::Broker(e.to_string()))
        },
        shutdown,
    )
}

#[cfg(not(feature = "kafka"))]
fn connect_kafka(_config: &GatewayConfig, _shutdown: &Shutdown) -> Result<Bridge, StartupError> {
    Err(StartupError::BindingUnavailable("kafka"))
}
