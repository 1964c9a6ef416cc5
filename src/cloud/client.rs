// ABOUTME: Capability trait for the cloud image service.
// ABOUTME: List/delete images and create/get/delete object-storage import jobs.

use async_trait::async_trait;
use serde::Serialize;

use crate::types::{ImageId, ImageName, JobId, JobState, ServiceInstanceId};

/// Operations the import controller needs from the cloud provider.
///
/// Every call is a single remote request. Implementations must not retry or
/// time out on their own; the surrounding reconcile loop owns both.
#[async_trait]
pub trait CloudImageClient: Send + Sync {
    /// List all images visible to the service instance.
    async fn list_images(&self) -> Result<Vec<RemoteImage>, CloudError>;

    /// Submit an import job that builds an image from an object-storage blob.
    async fn create_import_job(&self, request: &ImportJobRequest) -> Result<JobRef, CloudError>;

    /// Fetch the most recent import job of a service instance.
    ///
    /// Returns `CloudError::NotFound` when the instance has no import job.
    async fn get_import_job(&self, instance: &ServiceInstanceId)
    -> Result<ImportJob, CloudError>;

    /// Delete an image.
    async fn delete_image(&self, id: &ImageId) -> Result<(), CloudError>;

    /// Delete a job record.
    async fn delete_job(&self, id: &JobId) -> Result<(), CloudError>;
}

/// An image as reported by the provider's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImage {
    pub name: String,
    pub id: ImageId,
    pub state: Option<String>,
}

/// Handle returned when an import job is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRef {
    pub id: JobId,
}

/// A remote import job and its progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJob {
    pub id: JobId,
    pub state: JobState,
    pub message: Option<String>,
}

/// Who may read the source bucket. Imports only ever read public buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketAccess {
    Public,
}

/// Bucket access used for every import submitted by the controller.
pub const IMPORT_BUCKET_ACCESS: BucketAccess = BucketAccess::Public;

/// Body of an import job submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobRequest {
    pub image_name: ImageName,
    pub bucket_name: String,
    pub bucket_access: BucketAccess,
    pub region: String,
    pub image_filename: String,
    pub storage_type: String,
}

/// Errors from cloud image operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CloudError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("client setup failed: {0}")]
    Setup(String),
}

impl CloudError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }
}
