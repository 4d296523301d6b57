//! Application State
//!
//! Shared state passed to all API handlers.

use crate::observability::MetricsState;
use mongoscale_core::{RouterAddr, ShardProvisioner};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<ShardProvisioner>,
    /// Router address published at cluster bootstrap, threaded into every
    /// provisioning call.
    pub router: RouterAddr,
    pub metrics: MetricsState,
    pub readiness: Arc<AtomicBool>,
}
