//! Cloud capability traits
//!
//! The control plane consumes two external capabilities: a compute
//! provisioner (create and describe virtual machine instances) and a blob
//! store (host static assets readable by instance roles). Both are consumed
//! as traits; the concrete cloud SDK binding lives outside this crate.
//! [`mock`] provides in-memory recording implementations for tests and
//! local development.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub mod mock;

/// Default machine size for every cluster role.
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";

/// Errors surfaced by a cloud capability.
///
/// Propagated verbatim to the caller: no retry, no backoff, no partial
/// resource cleanup happens in this process.
#[derive(Debug, Clone, Error)]
pub enum CloudError {
    #[error("instance quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("machine image unavailable: {0}")]
    ImageUnavailable(String),
    #[error("cloud backend error: {0}")]
    Backend(String),
}

/// Identifier of a created compute instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a machine image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Selector used to resolve a machine image, e.g. a name pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSelector(pub String);

/// Location of an uploaded asset in blob storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobLocation {
    pub bucket: String,
    pub key: String,
}

/// Everything needed to launch one compute instance.
#[derive(Clone, Debug)]
pub struct LaunchRequest {
    pub image_id: ImageId,
    pub instance_type: String,
    pub key_name: String,
    pub security_group_ids: Vec<String>,
    pub subnet_id: String,
    /// Boot-time initialization script, placeholder-substituted.
    pub user_data: String,
    pub iam_role_arn: String,
    /// Value of the instance's `Name` tag.
    pub name_tag: String,
    /// Caller-supplied token forwarded to the backend so client-side retries
    /// cannot create duplicate instances.
    pub idempotency_token: Option<String>,
}

/// A created instance as reported by the compute provisioner.
#[derive(Clone, Debug)]
pub struct LaunchedInstance {
    pub id: InstanceId,
    /// Public address assigned at creation, when the backend reports one.
    pub public_ip: Option<String>,
}

/// Capability to create and describe virtual machine instances.
#[async_trait]
pub trait ComputeProvisioner: Send + Sync {
    /// Request creation of exactly one instance.
    async fn create_instance(&self, request: LaunchRequest) -> Result<LaunchedInstance, CloudError>;

    /// Resolve an image selector to a concrete image id.
    async fn describe_image(&self, selector: &ImageSelector) -> Result<ImageId, CloudError>;
}

/// Capability to host opaque byte payloads readable by instance roles.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload a local file, returning where it landed.
    async fn upload(&self, local_path: &Path) -> Result<BlobLocation, CloudError>;

    /// Grant read access on an uploaded asset to an IAM role.
    async fn grant_read(&self, location: &BlobLocation, role_arn: &str) -> Result<(), CloudError>;
}
