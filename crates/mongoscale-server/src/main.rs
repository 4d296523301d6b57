//! Mongoscale Server - AddShard service

use anyhow::Context;
use mongoscale_core::cloud::mock::RecordingCompute;
use mongoscale_core::cloud::ComputeProvisioner;
use mongoscale_core::config::ShardEnv;
use mongoscale_core::ShardProvisioner;
use mongoscale_server::{api, observability};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting Mongoscale Server...");

    // The whole configuration surface is the environment; a missing
    // variable fails startup immediately.
    let env = ShardEnv::from_env().context("Incomplete AddShard environment")?;
    let (config, router) = env
        .into_parts()
        .context("Invalid AddShard configuration")?;

    info!(router_ip = %router, image_id = %config.image_id, "Loaded AddShard configuration");

    let compute = compute_backend()?;
    let provisioner = Arc::new(ShardProvisioner::new(compute, config));

    let metrics = observability::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to initialize metrics: {e}"))?;

    let readiness = Arc::new(AtomicBool::new(false));
    let state = api::AppState {
        provisioner,
        router,
        metrics,
        readiness: readiness.clone(),
    };

    let app = api::create_router(state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    info!("Starting API server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    readiness.store(true, Ordering::Release);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Select the compute backend from `COMPUTE_BACKEND`.
///
/// The compute provisioner is an external capability consumed through a
/// trait; only the in-memory recording backend ships here. A cloud SDK
/// binding plugs in at this seam.
fn compute_backend() -> anyhow::Result<Arc<dyn ComputeProvisioner>> {
    let backend = std::env::var("COMPUTE_BACKEND").unwrap_or_else(|_| "recording".to_string());
    match backend.as_str() {
        "recording" => {
            warn!("Using the in-memory recording compute backend; no real instances will launch");
            Ok(Arc::new(RecordingCompute::new()))
        }
        other => anyhow::bail!("Unsupported compute backend: {other}"),
    }
}
