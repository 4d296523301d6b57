//! Observability
//!
//! Prometheus metrics for the AddShard service.

pub mod metrics;

pub use metrics::{init_metrics, MetricsState};
