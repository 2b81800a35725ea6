//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request metrics and the domain counters the
//!   handlers update.

pub mod metrics;
