//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the news gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// News listing defaults.
    pub news: NewsConfig,

    /// Message broker connection and topic names.
    pub broker: BrokerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Ceiling for one broker round trip (publish + reply) in seconds.
    pub round_trip_secs: u64,

    /// Total time allowed for one HTTP request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            round_trip_secs: 10,
            request_secs: 15,
        }
    }
}

/// Defaults applied when encoding news list commands.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Page size used when the client omits or garbles it.
    pub default_limit: u32,

    /// Page used when the client omits or garbles it.
    pub default_page: u32,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            default_page: 1,
        }
    }
}

/// Which broker binding to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    /// In-process topics; nothing leaves the process.
    #[default]
    Memory,
    /// Apache Kafka via librdkafka (requires the `kafka` feature).
    Kafka,
}

/// Broker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Binding to use.
    pub kind: BrokerKind,

    /// Bootstrap servers (e.g., "localhost:9093").
    pub brokers: Vec<String>,

    /// Client id reported to the broker.
    pub client_id: String,

    /// Consumer group used by every reply consumer.
    pub consumer_group: String,

    /// Topic names.
    pub topics: TopicConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: BrokerKind::Memory,
            brokers: vec!["localhost:9093".to_string()],
            client_id: "news-gateway".to_string(),
            consumer_group: "news-gateway".to_string(),
            topics: TopicConfig::default(),
        }
    }
}

/// Outbound (command) and inbound (reply) topic names.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Commands for the news service.
    pub news_input: String,
    /// Commands for the comments service.
    pub comments_input: String,
    /// New comments.
    pub add_comments: String,

    /// Replies carrying a single news item.
    pub news_detail: String,
    /// Replies carrying a news page.
    pub news_list: String,
    /// Replies to filtered listings.
    pub filtered_content: String,
    /// Replies to date-filtered listings.
    pub filter_published: String,
    /// Replies carrying comments.
    pub comments: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            news_input: "news_input".to_string(),
            comments_input: "comments_input".to_string(),
            add_comments: "add_comments".to_string(),
            news_detail: "newsdetail".to_string(),
            news_list: "newslist".to_string(),
            filtered_content: "filtered_content".to_string(),
            filter_published: "filter_published".to_string(),
            comments: "comments".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
