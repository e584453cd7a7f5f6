//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Keep the HTTP request timeout above the round trip ceiling
//! - Check every topic the gateway publishes to or consumes from is named
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{BrokerKind, GatewayConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.round_trip_secs == 0 {
        errors.push(ValidationError::new("timeouts.round_trip_secs", "must be greater than zero"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    } else if config.timeouts.round_trip_secs > 0
        && config.timeouts.request_secs <= config.timeouts.round_trip_secs
    {
        // The HTTP layer would cut requests off before the round trip could time out.
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must be greater than timeouts.round_trip_secs ({})",
                config.timeouts.round_trip_secs
            ),
        ));
    }

    if config.news.default_limit == 0 {
        errors.push(ValidationError::new("news.default_limit", "must be greater than zero"));
    }

    let topics = &config.broker.topics;
    let named = [
        ("broker.topics.news_input", &topics.news_input),
        ("broker.topics.comments_input", &topics.comments_input),
        ("broker.topics.add_comments", &topics.add_comments),
        ("broker.topics.news_detail", &topics.news_detail),
        ("broker.topics.news_list", &topics.news_list),
        ("broker.topics.filtered_content", &topics.filtered_content),
        ("broker.topics.filter_published", &topics.filter_published),
        ("broker.topics.comments", &topics.comments),
    ];
    for (field, value) in named {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "topic name must not be empty"));
        }
    }

    if config.broker.kind == BrokerKind::Kafka {
        if config.broker.brokers.iter().all(|b| b.trim().is_empty()) {
            errors.push(ValidationError::new("broker.brokers", "at least one broker is required"));
        }
        if config.broker.consumer_group.trim().is_empty() {
            errors.push(ValidationError::new("broker.consumer_group", "must not be empty"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
