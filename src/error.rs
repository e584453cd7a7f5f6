//! Gateway error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::broker::BrokerError;

/// Everything that can stop a request from producing a backend reply.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required query value is missing or empty.
    #[error("Invalid {0} parameter")]
    InvalidParameter(&'static str),

    /// The command never reached the broker.
    #[error("failed to publish to '{topic}': {source}")]
    PublishFailed {
        topic: String,
        #[source]
        source: BrokerError,
    },

    /// The reply channel failed while waiting.
    #[error("failed to read reply from '{channel}': {source}")]
    ReceiveFailed {
        channel: String,
        #[source]
        source: BrokerError,
    },

    /// No reply arrived before the deadline.
    #[error("no reply from '{channel}' before the deadline")]
    ReceiveTimeout { channel: String },

    /// A reply could not be merged into the composite response.
    #[error("unexpected reply payload: {0}")]
    Classification(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidParameter(_) => "invalid_parameter",
            GatewayError::PublishFailed { .. } => "publish_failed",
            GatewayError::ReceiveFailed { .. } => "receive_failed",
            GatewayError::ReceiveTimeout { .. } => "receive_timeout",
            GatewayError::Classification(_) => "classification",
        }
    }

    /// Message shown to clients. Topic names and broker details stay in logs.
    fn public_message(&self) -> String {
        match self {
            GatewayError::InvalidParameter(_) => self.to_string(),
            GatewayError::PublishFailed { .. } => "Failed to write message to broker".to_string(),
            GatewayError::ReceiveFailed { .. } => "Failed to read message from broker".to_string(),
            GatewayError::ReceiveTimeout { .. } => "Timed out waiting for backend reply".to_string(),
            GatewayError::Classification(_) => "Failed to combine backend replies".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.public_message() })).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
