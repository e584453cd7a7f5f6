//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Broker binding → Reply pumps → Bridge
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Stop pumps → Exit
//!     (the pumps keep answering until the HTTP drain has finished)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then broker, then listener
//! - Shutdown has timeout: exit after the grace period even if tasks linger

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{serve_until, Shutdown};
pub use startup::{build_bridge, connect, StartupError};
