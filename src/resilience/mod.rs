//! Resilience helpers.
//!
//! # Design Decisions
//! - Every broker interaction of a request is bounded by its deadline
//!   (enforced in `bridge::round_trip`)
//! - Requests are never retried; a failed call is reported to the client
//! - Background reply pumps back off between consecutive consume failures

pub mod backoff;
