//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! handlers, round trips, reply pumps produce:
//!     → logging.rs (structured log events, request_id on every request line)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
