//! Metrics Endpoint
//!
//! Exposes Prometheus metrics at GET /metrics

use super::state::AppState;
use axum::extract::State;

/// GET /metrics - Render all Prometheus metrics.
pub async fn get_metrics(State(state): State<AppState>) -> String {
    state.metrics.prometheus_handle.render()
}
