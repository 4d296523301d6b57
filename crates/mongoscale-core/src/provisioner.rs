//! Shard provisioner
//!
//! The on-demand AddShard operation: derive a fresh shard identity, render
//! the bootstrap template against the router address, and request exactly
//! one new compute instance tagged and named from that identity. Each call
//! is independent; the only state shared with the rest of the cluster is
//! the router address, which is passed in explicitly.

use crate::cloud::{
    BlobLocation, CloudError, ComputeProvisioner, ImageId, InstanceId, LaunchRequest,
};
use crate::identity::ShardId;
use crate::template::{placeholders, BootstrapTemplate, TemplateError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("router address must not be empty")]
    EmptyRouterAddr,
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Cloud(#[from] CloudError),
}

/// Reachable address of the cluster's router/config node.
///
/// Produced by the topology initializer and threaded explicitly into every
/// provisioning call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterAddr(String);

impl RouterAddr {
    pub fn new(addr: impl Into<String>) -> Result<Self, ProvisionError> {
        let addr = addr.into();
        if addr.trim().is_empty() {
            return Err(ProvisionError::EmptyRouterAddr);
        }
        Ok(Self(addr))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouterAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static configuration for shard provisioning.
///
/// Everything here is fixed at cluster bootstrap; only the shard identity
/// varies between calls.
#[derive(Clone, Debug)]
pub struct ShardConfig {
    pub vpc_id: String,
    pub security_group_id: String,
    pub key_name: String,
    pub image_id: ImageId,
    pub subnet_id: String,
    pub instance_role_arn: String,
    pub instance_type: String,
    /// Blob-store location of the shard's compose definition.
    pub compose_location: BlobLocation,
    /// Shard bootstrap script with placeholder tokens.
    pub template: BootstrapTemplate,
}

/// One successfully provisioned shard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvisionedShard {
    pub instance_id: InstanceId,
    pub shard_id: ShardId,
    pub replica_set: String,
    pub instance_tag: String,
}

/// Executes AddShard calls against a compute provisioner.
pub struct ShardProvisioner {
    compute: Arc<dyn ComputeProvisioner>,
    config: ShardConfig,
}

impl ShardProvisioner {
    pub fn new(compute: Arc<dyn ComputeProvisioner>, config: ShardConfig) -> Self {
        Self { compute, config }
    }

    pub fn config(&self) -> &ShardConfig {
        &self.config
    }

    /// Launch one new shard instance joined to the given router.
    ///
    /// The replica-set name embedded in the bootstrap payload and the
    /// instance name tag derive from the same freshly generated identity.
    /// Backend failures propagate unmodified; a failed call creates no
    /// observable side effect here.
    pub async fn add_shard(
        &self,
        router: &RouterAddr,
        idempotency_token: Option<&str>,
    ) -> Result<ProvisionedShard, ProvisionError> {
        self.add_shard_with_id(router, ShardId::generate(), idempotency_token)
            .await
    }

    async fn add_shard_with_id(
        &self,
        router: &RouterAddr,
        shard_id: ShardId,
        idempotency_token: Option<&str>,
    ) -> Result<ProvisionedShard, ProvisionError> {
        let replica_set = shard_id.replica_set();
        let instance_tag = shard_id.instance_tag();

        let user_data = self.config.template.render(&[
            (placeholders::ROUTER_IP, router.as_str()),
            (placeholders::S3_DOMAIN, &self.config.compose_location.bucket),
            (placeholders::OBJECT_KEY, &self.config.compose_location.key),
            (placeholders::UNIQUE_SHARD_NAME, &replica_set),
        ])?;

        let launched = self
            .compute
            .create_instance(LaunchRequest {
                image_id: self.config.image_id.clone(),
                instance_type: self.config.instance_type.clone(),
                key_name: self.config.key_name.clone(),
                security_group_ids: vec![self.config.security_group_id.clone()],
                subnet_id: self.config.subnet_id.clone(),
                user_data,
                iam_role_arn: self.config.instance_role_arn.clone(),
                name_tag: instance_tag.clone(),
                idempotency_token: idempotency_token.map(str::to_owned),
            })
            .await?;

        info!(
            instance_id = %launched.id,
            shard_id = %shard_id,
            replica_set = %replica_set,
            "Provisioned shard instance"
        );

        Ok(ProvisionedShard {
            instance_id: launched.id,
            shard_id,
            replica_set,
            instance_tag,
        })
    }
}
