//! Topology initializer
//!
//! One-time cluster bootstrap: upload static assets, create the
//! router/config instance, the monitoring instance, and the seed shard, and
//! hand back the router's address together with everything the AddShard
//! service needs afterwards. The router is always created before the seed
//! shard because the shard's bootstrap payload embeds the router's address;
//! the monitoring instance has no bootstrap coupling to either.
//!
//! There is no partial-cluster repair: any creation failure aborts the whole
//! initialization. Bootstrap is a one-time, operator-supervised action.

use crate::cloud::{
    BlobLocation, BlobStore, CloudError, ComputeProvisioner, ImageId, ImageSelector, InstanceId,
    LaunchRequest,
};
use crate::config::vars;
use crate::provisioner::{
    ProvisionError, ProvisionedShard, RouterAddr, ShardConfig, ShardProvisioner,
};
use crate::template::{placeholders, BootstrapTemplate, TemplateError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Name tag of the router/config instance.
pub const ROUTER_TAG: &str = "MongoRouterInstance";
/// Name tag of the monitoring instance.
pub const MONITOR_TAG: &str = "MongoMonitoringInstance";

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to read asset {path}: {source}")]
    Asset {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("compute provisioner reported no public address for the router instance")]
    RouterAddressMissing,
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Cloud(#[from] CloudError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

/// Static bootstrap assets on local disk.
#[derive(Clone, Debug)]
pub struct AssetPaths {
    /// Init script for the router/config instance.
    pub router_script: PathBuf,
    /// Init script for shard instances (also used by AddShard).
    pub shard_script: PathBuf,
    /// Compose definition for the router/config containers.
    pub router_compose: PathBuf,
    /// Compose definition for shard containers.
    pub shard_compose: PathBuf,
    /// Monitoring agent configuration.
    pub monitoring_config: PathBuf,
}

impl AssetPaths {
    /// Conventional file names under a single asset directory.
    pub fn under(dir: &Path) -> Self {
        Self {
            router_script: dir.join("router-init.sh"),
            shard_script: dir.join("shard-init.sh"),
            router_compose: dir.join("router-compose.yml"),
            shard_compose: dir.join("shard-compose.yml"),
            monitoring_config: dir.join("monitoring-agent.json"),
        }
    }
}

/// Static configuration for cluster bootstrap.
#[derive(Clone, Debug)]
pub struct TopologyConfig {
    pub assets: AssetPaths,
    pub image: ImageSelector,
    pub instance_type: String,
    pub key_name: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub instance_role_arn: String,
}

/// Everything a bootstrapped cluster hands to its operators.
///
/// Serialized to disk by the bootstrap CLI so the router address and the
/// AddShard configuration survive the process (the durable, externally
/// readable publication of the router address).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterTopology {
    pub router_addr: RouterAddr,
    pub router_instance: InstanceId,
    pub monitor_instance: InstanceId,
    pub seed_shard: ProvisionedShard,
    /// Shard bootstrap template, base64-encoded for environment transport.
    pub shard_template_base64: String,
    pub compose_location: BlobLocation,
    pub image_id: ImageId,
    pub key_name: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub instance_role_arn: String,
}

impl ClusterTopology {
    /// The environment block the AddShard service reads at startup.
    pub fn server_env(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            (vars::VPC_ID, self.vpc_id.clone()),
            (vars::SECURITY_GROUP_ID, self.security_group_id.clone()),
            (vars::ROUTER_IP, self.router_addr.as_str().to_string()),
            (vars::AMI_ID, self.image_id.0.clone()),
            (vars::KEY_NAME, self.key_name.clone()),
            (vars::SUBNET_ID, self.subnet_id.clone()),
            (vars::ROLE_ARN, self.instance_role_arn.clone()),
            (vars::USER_DATA, self.shard_template_base64.clone()),
            (vars::S3_BUCKET_NAME, self.compose_location.bucket.clone()),
            (vars::OBJECT_KEY, self.compose_location.key.clone()),
        ])
    }
}

/// Builds the initial three-role cluster.
pub struct TopologyInitializer {
    compute: Arc<dyn ComputeProvisioner>,
    blobs: Arc<dyn BlobStore>,
    config: TopologyConfig,
}

impl TopologyInitializer {
    pub fn new(
        compute: Arc<dyn ComputeProvisioner>,
        blobs: Arc<dyn BlobStore>,
        config: TopologyConfig,
    ) -> Self {
        Self {
            compute,
            blobs,
            config,
        }
    }

    /// Stand up the router, monitoring, and seed shard instances.
    pub async fn initialize(&self) -> Result<ClusterTopology, TopologyError> {
        let assets = &self.config.assets;
        let role_arn = &self.config.instance_role_arn;

        // Assets first: the instances fetch them at boot.
        let router_compose = self.blobs.upload(&assets.router_compose).await?;
        let shard_compose = self.blobs.upload(&assets.shard_compose).await?;
        let monitoring = self.blobs.upload(&assets.monitoring_config).await?;
        for location in [&router_compose, &shard_compose, &monitoring] {
            self.blobs.grant_read(location, role_arn).await?;
        }
        info!(bucket = %router_compose.bucket, "Uploaded bootstrap assets");

        let image_id = self.compute.describe_image(&self.config.image).await?;

        // Router first: its address is an input to every shard payload.
        let router_template = read_asset(&assets.router_script)?;
        let router_user_data = router_template.render(&[
            (placeholders::S3_DOMAIN, router_compose.bucket.as_str()),
            (placeholders::OBJECT_KEY, router_compose.key.as_str()),
            (
                placeholders::S3_MONITORING_JSON_DOMAIN,
                monitoring.bucket.as_str(),
            ),
            (placeholders::MONITORING_JSON_KEY, monitoring.key.as_str()),
        ])?;
        let router = self
            .compute
            .create_instance(self.launch_request(&image_id, ROUTER_TAG, router_user_data))
            .await?;
        let router_addr = RouterAddr::new(
            router
                .public_ip
                .ok_or(TopologyError::RouterAddressMissing)?,
        )?;
        info!(
            instance_id = %router.id,
            router_ip = %router_addr,
            "Router/config instance created"
        );

        // The monitoring node boots stock; its agent config is pulled by the
        // router's init script.
        let monitor = self
            .compute
            .create_instance(self.launch_request(&image_id, MONITOR_TAG, String::new()))
            .await?;
        info!(instance_id = %monitor.id, "Monitoring instance created");

        // Seed shard goes through the same provisioning path as every shard
        // added later, so both are configured identically in kind.
        let shard_template = read_asset(&assets.shard_script)?;
        let provisioner = ShardProvisioner::new(
            self.compute.clone(),
            ShardConfig {
                vpc_id: self.config.vpc_id.clone(),
                security_group_id: self.config.security_group_id.clone(),
                key_name: self.config.key_name.clone(),
                image_id: image_id.clone(),
                subnet_id: self.config.subnet_id.clone(),
                instance_role_arn: role_arn.clone(),
                instance_type: self.config.instance_type.clone(),
                compose_location: shard_compose.clone(),
                template: shard_template.clone(),
            },
        );
        let seed_shard = provisioner.add_shard(&router_addr, None).await?;
        info!(
            instance_id = %seed_shard.instance_id,
            replica_set = %seed_shard.replica_set,
            "Seed shard instance created"
        );

        Ok(ClusterTopology {
            router_addr,
            router_instance: router.id,
            monitor_instance: monitor.id,
            seed_shard,
            shard_template_base64: shard_template.to_base64(),
            compose_location: shard_compose,
            image_id,
            key_name: self.config.key_name.clone(),
            vpc_id: self.config.vpc_id.clone(),
            subnet_id: self.config.subnet_id.clone(),
            security_group_id: self.config.security_group_id.clone(),
            instance_role_arn: role_arn.clone(),
        })
    }

    fn launch_request(&self, image_id: &ImageId, tag: &str, user_data: String) -> LaunchRequest {
        LaunchRequest {
            image_id: image_id.clone(),
            instance_type: self.config.instance_type.clone(),
            key_name: self.config.key_name.clone(),
            security_group_ids: vec![self.config.security_group_id.clone()],
            subnet_id: self.config.subnet_id.clone(),
            user_data,
            iam_role_arn: self.config.instance_role_arn.clone(),
            name_tag: tag.to_string(),
            idempotency_token: None,
        }
    }
}

fn read_asset(path: &Path) -> Result<BootstrapTemplate, TopologyError> {
    let text = std::fs::read_to_string(path).map_err(|source| TopologyError::Asset {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BootstrapTemplate::new(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::mock::{RecordingBlobStore, RecordingCompute};
    use crate::cloud::DEFAULT_INSTANCE_TYPE;
    use std::fs;
    use tempfile::TempDir;

    const ROUTER_SCRIPT: &str = "#!/bin/bash\n\
        curl https://%S3_DOMAIN%.s3.amazonaws.com/%OBJECT_KEY% -o compose.yml\n\
        curl https://%S3_MONITORING_JSON_DOMAIN%.s3.amazonaws.com/%MONITORING_JSON_KEY% -o agent.json\n";

    const SHARD_SCRIPT: &str = "#!/bin/bash\n\
        curl https://%S3_DOMAIN%.s3.amazonaws.com/%OBJECT_KEY% -o compose.yml\n\
        mongod --replSet %UNIQUE_SHARD_NAME%\n\
        mongosh mongodb://%ROUTER_IP%:27017\n";

    fn write_assets(dir: &TempDir) -> AssetPaths {
        let paths = AssetPaths::under(dir.path());
        fs::write(&paths.router_script, ROUTER_SCRIPT).unwrap();
        fs::write(&paths.shard_script, SHARD_SCRIPT).unwrap();
        fs::write(&paths.router_compose, "services: {}\n").unwrap();
        fs::write(&paths.shard_compose, "services: {}\n").unwrap();
        fs::write(&paths.monitoring_config, "{}\n").unwrap();
        paths
    }

    fn config(assets: AssetPaths) -> TopologyConfig {
        TopologyConfig {
            assets,
            image: ImageSelector("al2023-ami-*".into()),
            instance_type: DEFAULT_INSTANCE_TYPE.into(),
            key_name: "mongodb-router-key".into(),
            vpc_id: "vpc-1234".into(),
            subnet_id: "subnet-1234".into(),
            security_group_id: "sg-1234".into(),
            instance_role_arn: "arn:aws:iam::123456789012:role/mongo-instance".into(),
        }
    }

    #[tokio::test]
    async fn test_router_is_created_before_the_seed_shard() {
        let dir = TempDir::new().unwrap();
        let compute = Arc::new(RecordingCompute::new());
        let blobs = Arc::new(RecordingBlobStore::default());
        let init =
            TopologyInitializer::new(compute.clone(), blobs, config(write_assets(&dir)));

        init.initialize().await.unwrap();

        let tags: Vec<String> = compute
            .requests()
            .iter()
            .map(|r| r.name_tag.clone())
            .collect();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0], ROUTER_TAG);
        assert_eq!(tags[1], MONITOR_TAG);
        assert!(tags[2].starts_with("MongoShardInstance"));
    }

    #[tokio::test]
    async fn test_seed_shard_payload_embeds_the_router_address() {
        let dir = TempDir::new().unwrap();
        let compute = Arc::new(RecordingCompute::new());
        let blobs = Arc::new(RecordingBlobStore::default());
        let init =
            TopologyInitializer::new(compute.clone(), blobs, config(write_assets(&dir)));

        let topology = init.initialize().await.unwrap();

        let requests = compute.requests();
        let shard_request = requests.last().unwrap();
        assert!(shard_request
            .user_data
            .contains(topology.router_addr.as_str()));
        assert!(shard_request
            .user_data
            .contains(&topology.seed_shard.replica_set));
        assert!(requests[1].user_data.is_empty());
    }

    #[tokio::test]
    async fn test_assets_are_uploaded_and_read_granted() {
        let dir = TempDir::new().unwrap();
        let compute = Arc::new(RecordingCompute::new());
        let blobs = Arc::new(RecordingBlobStore::default());
        let init = TopologyInitializer::new(
            compute,
            blobs.clone(),
            config(write_assets(&dir)),
        );

        init.initialize().await.unwrap();

        assert_eq!(blobs.uploads().len(), 3);
        assert_eq!(blobs.grants().len(), 3);
        assert!(blobs
            .grants()
            .iter()
            .all(|(_, role)| role.ends_with("role/mongo-instance")));
    }

    #[tokio::test]
    async fn test_creation_failure_aborts_initialization() {
        let dir = TempDir::new().unwrap();
        let compute = Arc::new(RecordingCompute::new());
        compute.fail_with(CloudError::ImageUnavailable("ami not shared".into()));
        let blobs = Arc::new(RecordingBlobStore::default());
        let init =
            TopologyInitializer::new(compute.clone(), blobs, config(write_assets(&dir)));

        let err = init.initialize().await.unwrap_err();
        assert!(matches!(
            err,
            TopologyError::Cloud(CloudError::ImageUnavailable(_))
        ));
        assert_eq!(compute.launch_count(), 0);
    }

    #[tokio::test]
    async fn test_router_without_public_address_is_an_error() {
        let dir = TempDir::new().unwrap();
        let compute = Arc::new(RecordingCompute::without_public_ips());
        let blobs = Arc::new(RecordingBlobStore::default());
        let init =
            TopologyInitializer::new(compute.clone(), blobs, config(write_assets(&dir)));

        let err = init.initialize().await.unwrap_err();
        assert!(matches!(err, TopologyError::RouterAddressMissing));
        // Only the router launch went out before the abort.
        assert_eq!(compute.launch_count(), 1);
    }

    #[tokio::test]
    async fn test_server_env_matches_shard_configuration() {
        let dir = TempDir::new().unwrap();
        let compute = Arc::new(RecordingCompute::new());
        let blobs = Arc::new(RecordingBlobStore::default());
        let init = TopologyInitializer::new(compute, blobs, config(write_assets(&dir)));

        let topology = init.initialize().await.unwrap();
        let env = topology.server_env();

        assert_eq!(env[vars::ROUTER_IP], topology.router_addr.as_str());
        assert_eq!(env[vars::KEY_NAME], "mongodb-router-key");
        let template = BootstrapTemplate::from_base64(&env[vars::USER_DATA]).unwrap();
        assert_eq!(template.as_str(), SHARD_SCRIPT);
    }
}
