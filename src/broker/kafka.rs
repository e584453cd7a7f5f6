//! Kafka binding built on librdkafka.
//!
//! # Responsibilities
//! - Build one shared `FutureProducer` for every outbound topic
//! - Build one `StreamConsumer` per reply topic, all in the gateway's group
//! - Carry correlation ids as message key plus header

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    error::KafkaError,
    message::{Header, Headers, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    ClientConfig, Message,
};

use crate::broker::{BrokerError, InboundMessage, OutboundMessage, Publisher, ReplySource};
use crate::config::BrokerConfig;

/// How long librdkafka may queue a message locally before giving up.
const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

fn base_config(config: &BrokerConfig) -> ClientConfig {
    let mut cfg = ClientConfig::new();
    cfg.set("bootstrap.servers", config.brokers.join(","));
    cfg.set("client.id", config.client_id.as_str());
    cfg
}

/// Publishes commands to Kafka topics.
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    pub fn new(config: &BrokerConfig) -> Result<Self, KafkaError> {
        let mut cfg = base_config(config);
        cfg.set("acks", "1");
        cfg.set("message.timeout.ms", "10000");
        let producer: FutureProducer = cfg.create()?;

        tracing::info!(brokers = ?config.brokers, "Kafka producer created");
        Ok(Self { producer })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<(), BrokerError> {
        let mut headers = OwnedHeaders::new();
        for (key, value) in &message.headers {
            headers = headers.insert(Header {
                key: key.as_str(),
                value: Some(value.as_str()),
            });
        }

        let mut record = FutureRecord::to(topic)
            .payload(&message.payload[..])
            .headers(headers);
        if let Some(key) = message.key.as_deref() {
            record = record.key(key);
        }

        self.producer
            .send(record, ENQUEUE_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|(e, _msg)| BrokerError::Delivery {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Consumes replies from one Kafka topic.
pub struct KafkaReplySource {
    topic: String,
    consumer: StreamConsumer,
}

impl KafkaReplySource {
    pub fn new(config: &BrokerConfig, topic: &str) -> Result<Self, KafkaError> {
        let mut cfg = base_config(config);
        cfg.set("group.id", config.consumer_group.as_str());
        cfg.set("enable.auto.commit", "true");
        cfg.set("auto.offset.reset", "latest");

        let consumer: StreamConsumer = cfg.create()?;
        consumer.subscribe(&[topic])?;

        tracing::info!(topic = %topic, group = %config.consumer_group, "Kafka reply consumer subscribed");
        Ok(Self {
            topic: topic.to_string(),
            consumer,
        })
    }
}

#[async_trait]
impl ReplySource for KafkaReplySource {
    fn name(&self) -> &str {
        &self.topic
    }

    async fn receive_next(&self) -> Result<InboundMessage, BrokerError> {
        let msg = self.consumer.recv().await.map_err(|e| BrokerError::Consume {
            topic: self.topic.clone(),
            reason: e.to_string(),
        })?;

        let mut headers = Vec::new();
        if let Some(hdrs) = msg.headers() {
            for i in 0..hdrs.count() {
                let h = hdrs.get(i);
                // Non-UTF-8 headers are not ours; skip them.
                if let Some(Ok(value)) = h.value.map(std::str::from_utf8) {
                    headers.push((h.key.to_string(), value.to_string()));
                }
            }
        }

        Ok(InboundMessage {
            key: msg
                .key()
                .and_then(|k| std::str::from_utf8(k).ok())
                .map(str::to_string),
            headers,
            payload: Bytes::copy_from_slice(msg.payload().unwrap_or(&[])),
        })
    }
}
