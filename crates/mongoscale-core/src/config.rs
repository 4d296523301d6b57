//! AddShard environment configuration
//!
//! The AddShard service is configured entirely through its environment, the
//! same variable block the topology initializer publishes. Every variable is
//! required; there are no defaults and no validation beyond presence, so a
//! missing value surfaces immediately at startup.

use crate::cloud::{BlobLocation, ImageId};
use crate::provisioner::{ProvisionError, RouterAddr, ShardConfig};
use crate::template::BootstrapTemplate;
use thiserror::Error;

/// Environment variable names for the AddShard configuration surface.
pub mod vars {
    pub const VPC_ID: &str = "VPC_ID";
    pub const SECURITY_GROUP_ID: &str = "SECURITY_GROUP_ID";
    pub const ROUTER_IP: &str = "ROUTER_IP";
    pub const AMI_ID: &str = "AMI_ID";
    pub const KEY_NAME: &str = "KEY_NAME";
    pub const SUBNET_ID: &str = "SUBNET_ID";
    pub const ROLE_ARN: &str = "ROLE_ARN";
    /// Base64-encoded shard bootstrap template.
    pub const USER_DATA: &str = "USER_DATA";
    pub const S3_BUCKET_NAME: &str = "S3_BUCKET_NAME";
    pub const OBJECT_KEY: &str = "OBJECT_KEY";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

/// Raw AddShard environment, one field per required variable.
#[derive(Clone, Debug)]
pub struct ShardEnv {
    pub vpc_id: String,
    pub security_group_id: String,
    pub router_ip: String,
    pub ami_id: String,
    pub key_name: String,
    pub subnet_id: String,
    pub role_arn: String,
    pub user_data_base64: String,
    pub s3_bucket_name: String,
    pub object_key: String,
}

impl ShardEnv {
    /// Read every required variable from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            vpc_id: required(vars::VPC_ID)?,
            security_group_id: required(vars::SECURITY_GROUP_ID)?,
            router_ip: required(vars::ROUTER_IP)?,
            ami_id: required(vars::AMI_ID)?,
            key_name: required(vars::KEY_NAME)?,
            subnet_id: required(vars::SUBNET_ID)?,
            role_arn: required(vars::ROLE_ARN)?,
            user_data_base64: required(vars::USER_DATA)?,
            s3_bucket_name: required(vars::S3_BUCKET_NAME)?,
            object_key: required(vars::OBJECT_KEY)?,
        })
    }

    /// Decode into the provisioning configuration and the router address.
    pub fn into_parts(self) -> Result<(ShardConfig, RouterAddr), ProvisionError> {
        let router = RouterAddr::new(self.router_ip)?;
        let template = BootstrapTemplate::from_base64(&self.user_data_base64)?;
        let config = ShardConfig {
            vpc_id: self.vpc_id,
            security_group_id: self.security_group_id,
            key_name: self.key_name,
            image_id: ImageId(self.ami_id),
            subnet_id: self.subnet_id,
            instance_role_arn: self.role_arn,
            instance_type: crate::cloud::DEFAULT_INSTANCE_TYPE.to_string(),
            compose_location: BlobLocation {
                bucket: self.s3_bucket_name,
                key: self.object_key,
            },
            template,
        };
        Ok((config, router))
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}
