//! Mongoscale Server Library
//!
//! The AddShard service: an HTTP trigger surface over the core shard
//! provisioner, plus health probes and Prometheus metrics.

pub mod api;
pub mod observability;
