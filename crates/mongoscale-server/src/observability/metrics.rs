//! Prometheus Metrics
//!
//! Metrics tracked:
//! - `mongoscale_shards_provisioned_total` - counter of successful AddShard calls
//! - `mongoscale_shard_provision_failures_total` - counter of failed calls by kind

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// State containing the Prometheus handle for metrics export
#[derive(Clone)]
pub struct MetricsState {
    pub prometheus_handle: PrometheusHandle,
}

/// Initialize the Prometheus recorder and register metric descriptions.
pub fn init_metrics() -> Result<MetricsState, Box<dyn std::error::Error + Send + Sync>> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "mongoscale_shards_provisioned_total",
        "Total number of shard instances provisioned"
    );
    describe_counter!(
        "mongoscale_shard_provision_failures_total",
        "Total number of failed AddShard calls"
    );

    Ok(MetricsState {
        prometheus_handle: handle,
    })
}

/// Record a successful AddShard call.
pub fn record_shard_provisioned() {
    counter!("mongoscale_shards_provisioned_total").increment(1);
}

/// Record a failed AddShard call.
pub fn record_shard_provision_failure(kind: &str) {
    counter!(
        "mongoscale_shard_provision_failures_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}
