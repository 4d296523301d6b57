//! In-memory recording capabilities
//!
//! Test doubles for the cloud traits. They record every call in order and
//! can be programmed to fail, which is how the call-sequence and error
//! propagation properties of the provisioning logic are exercised. The
//! binaries also fall back to these when no real cloud backend is wired.

use super::{
    BlobLocation, BlobStore, CloudError, ComputeProvisioner, ImageId, ImageSelector, InstanceId,
    LaunchRequest, LaunchedInstance,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Recording compute provisioner.
///
/// Assigns sequential instance ids and synthetic public addresses from the
/// TEST-NET-3 range unless configured otherwise.
#[derive(Debug, Default)]
pub struct RecordingCompute {
    requests: Mutex<Vec<LaunchRequest>>,
    counter: AtomicU64,
    fail_with: Mutex<Option<CloudError>>,
    assign_public_ips: bool,
}

impl RecordingCompute {
    pub fn new() -> Self {
        Self {
            assign_public_ips: true,
            ..Self::default()
        }
    }

    /// A compute double whose instances come up without a public address.
    pub fn without_public_ips() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with the given error.
    pub fn fail_with(&self, error: CloudError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    /// Launch requests seen so far, in call order.
    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ComputeProvisioner for RecordingCompute {
    async fn create_instance(&self, request: LaunchRequest) -> Result<LaunchedInstance, CloudError> {
        if let Some(error) = self.fail_with.lock().unwrap().clone() {
            return Err(error);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request);
        Ok(LaunchedInstance {
            id: InstanceId(format!("i-{n:010}")),
            public_ip: self.assign_public_ips.then(|| format!("203.0.113.{n}")),
        })
    }

    async fn describe_image(&self, selector: &ImageSelector) -> Result<ImageId, CloudError> {
        if let Some(error) = self.fail_with.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(ImageId(format!("ami-{}", selector.0.replace('*', "latest"))))
    }
}

/// Recording blob store.
///
/// Uploads land under a fixed bucket with the file name as the key; grants
/// are recorded for inspection.
#[derive(Debug)]
pub struct RecordingBlobStore {
    bucket: String,
    uploads: Mutex<Vec<PathBuf>>,
    grants: Mutex<Vec<(BlobLocation, String)>>,
}

impl RecordingBlobStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            uploads: Mutex::new(Vec::new()),
            grants: Mutex::new(Vec::new()),
        }
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn grants(&self) -> Vec<(BlobLocation, String)> {
        self.grants.lock().unwrap().clone()
    }
}

impl Default for RecordingBlobStore {
    fn default() -> Self {
        Self::new("mongoscale-assets")
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn upload(&self, local_path: &Path) -> Result<BlobLocation, CloudError> {
        let key = local_path
            .file_name()
            .ok_or_else(|| {
                CloudError::InvalidParameter(format!("not a file path: {}", local_path.display()))
            })?
            .to_string_lossy()
            .into_owned();
        self.uploads.lock().unwrap().push(local_path.to_path_buf());
        Ok(BlobLocation {
            bucket: self.bucket.clone(),
            key: format!("assets/{key}"),
        })
    }

    async fn grant_read(&self, location: &BlobLocation, role_arn: &str) -> Result<(), CloudError> {
        self.grants
            .lock()
            .unwrap()
            .push((location.clone(), role_arn.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::DEFAULT_INSTANCE_TYPE;

    fn request(tag: &str) -> LaunchRequest {
        LaunchRequest {
            image_id: ImageId("ami-test".into()),
            instance_type: DEFAULT_INSTANCE_TYPE.into(),
            key_name: "test-key".into(),
            security_group_ids: vec!["sg-1".into()],
            subnet_id: "subnet-1".into(),
            user_data: String::new(),
            iam_role_arn: "arn:aws:iam::123456789012:role/test".into(),
            name_tag: tag.into(),
            idempotency_token: None,
        }
    }

    #[tokio::test]
    async fn test_sequential_instance_ids() {
        let compute = RecordingCompute::new();
        let a = compute.create_instance(request("a")).await.unwrap();
        let b = compute.create_instance(request("b")).await.unwrap();
        assert_eq!(a.id.0, "i-0000000001");
        assert_eq!(b.id.0, "i-0000000002");
        assert!(a.public_ip.is_some());
        assert_eq!(compute.launch_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_records_nothing() {
        let compute = RecordingCompute::new();
        compute.fail_with(CloudError::QuotaExceeded("vCPU limit".into()));
        assert!(compute.create_instance(request("a")).await.is_err());
        assert_eq!(compute.launch_count(), 0);
    }
}
