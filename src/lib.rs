//! News gateway library.
//!
//! Serves synchronous HTTP endpoints on top of asynchronous backend services
//! that talk over broker topics.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http ──▶ bridge::command ──▶ round_trip ───┼──▶ request topics
//!                           │                                   ▲          │
//!                           │                   bridge::correlation        │
//!                           │                          (reply pumps) ◀─────┼─── reply topics
//!     Client Response       │                                              │
//!     ◀─────────────────────┼── http ◀── bridge::classify ◀── aggregate    │
//!                           │                                              │
//!                           │  config · observability · lifecycle · error  │
//!                           └──────────────────────────────────────────────┘
//! ```

pub mod bridge;
pub mod broker;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
