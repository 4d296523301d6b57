//! HTTP API Module
//!
//! REST endpoints for the AddShard service.
//!
//! This module contains:
//! - `state`: Shared application state
//! - `health`: Liveness and readiness probes
//! - `metrics`: Prometheus metrics endpoint
//! - `shards`: The AddShard trigger endpoint

mod health;
mod metrics;
mod shards;
mod state;

pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Observability
        .route("/metrics", get(metrics::get_metrics))
        // The sole externally invokable operation
        .route("/shards", post(shards::add_shard))
        .with_state(state)
}
