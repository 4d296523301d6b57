//! Core provisioning logic for the mongoscale control plane
//!
//! This crate contains the cluster bootstrap and shard scaling logic shared
//! by the mongoscale binaries:
//!
//! - `identity`: wall-clock derived shard identities and their derived names
//! - `template`: placeholder substitution for instance bootstrap scripts
//! - `cloud`: compute provisioner and blob store capability traits
//! - `provisioner`: the on-demand AddShard operation
//! - `topology`: one-time cluster initialization (router, monitor, seed shard)
//! - `config`: the environment configuration surface for the AddShard service

pub mod cloud;
pub mod config;
pub mod identity;
pub mod provisioner;
pub mod template;
pub mod topology;

pub use cloud::{BlobLocation, BlobStore, CloudError, ComputeProvisioner, InstanceId};
pub use identity::ShardId;
pub use provisioner::{ProvisionError, ProvisionedShard, RouterAddr, ShardConfig, ShardProvisioner};
pub use template::{BootstrapTemplate, TemplateError};
pub use topology::{ClusterTopology, TopologyConfig, TopologyError, TopologyInitializer};
