// ABOUTME: Import controller operations on an image scope.
// ABOUTME: Idempotent image creation, import job polling, and remote teardown.

use crate::cloud::{
    CloudError, CloudImageClient, IMPORT_BUCKET_ACCESS, ImportJob, ImportJobRequest, JobRef,
    RemoteImage,
};
use crate::events::Reason;
use crate::store::ImageStore;
use crate::types::ImageId;

use super::ImageScope;

/// Result of one `ensure_image` call. Exactly one of these per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// An image with the resource's name already exists.
    Found(RemoteImage),
    /// An earlier import job is still running; try again later.
    Pending(ImportJob),
    /// A new import job was submitted.
    Created(JobRef),
}

impl<C: CloudImageClient, S: ImageStore> ImageScope<C, S> {
    /// Make sure the image exists or is being imported, without ever starting
    /// a second import.
    ///
    /// Two guards run before anything is created: an image with the same name
    /// short-circuits to `Found`, and a still-running job for the service
    /// instance short-circuits to `Pending`. The job lookup does not depend on
    /// the stored job ID, so a job submitted by an abandoned pass is seen too.
    ///
    /// The caller records the job ID from `Created`; this method does not
    /// touch the status.
    ///
    /// # Errors
    ///
    /// Listing, job lookup (other than "not found"), and job creation failures
    /// are returned unchanged after a warning event.
    pub async fn ensure_image(&self) -> Result<EnsureOutcome, CloudError> {
        let name = self.image.name.as_str();

        if let Some(existing) = self.find_remote_image().await? {
            tracing::info!(parent: &self.span, "Image already exists");
            self.recorder.success(
                name,
                Reason::SuccessfulRetrieveImage,
                &format!("Retrieved image {:?}", existing.name),
            );
            return Ok(EnsureOutcome::Found(existing));
        }

        if let Some(job) = self.last_import_job().await? {
            if !job.state.is_terminal() {
                tracing::info!(
                    parent: &self.span,
                    "Previous import job {} not yet finished - {}",
                    job.id,
                    job.state
                );
                return Ok(EnsureOutcome::Pending(job));
            }
            tracing::debug!(
                parent: &self.span,
                "Previous import job {} is {}, submitting a new one",
                job.id,
                job.state
            );
        }

        let request = self.import_request();
        match self.client.create_import_job(&request).await {
            Ok(job_ref) => {
                tracing::info!(parent: &self.span, "New import job request created");
                self.recorder.success(
                    name,
                    Reason::SuccessfulCreateImageImportJob,
                    &format!("Created image import job {:?}", job_ref.id.as_str()),
                );
                Ok(EnsureOutcome::Created(job_ref))
            }
            Err(e) => {
                tracing::info!(parent: &self.span, "Unable to create new import job request");
                self.recorder.warn(
                    name,
                    Reason::FailedCreateImageImportJob,
                    &format!("Failed image import job creation - {}", e),
                );
                Err(e)
            }
        }
    }

    /// Import request for the resource's `ImageSpec`.
    pub fn import_request(&self) -> ImportJobRequest {
        let spec = &self.image.spec;
        ImportJobRequest {
            image_name: self.image.name.clone(),
            bucket_name: spec.bucket.clone(),
            bucket_access: IMPORT_BUCKET_ACCESS,
            region: spec.region.clone(),
            image_filename: spec.object.clone(),
            storage_type: spec.storage_type.clone(),
        }
    }

    /// Current import job of the service instance, if there is one.
    ///
    /// A plain read: no status change and no event.
    pub async fn poll_job(&self) -> Result<Option<ImportJob>, CloudError> {
        match self
            .client
            .get_import_job(&self.image.spec.service_instance_id)
            .await
        {
            Ok(job) => Ok(Some(job)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete the tracked image.
    ///
    /// Returns `Ok(false)` without a remote call when no image ID is tracked,
    /// `Ok(true)` once the provider confirmed the image is gone. The status is
    /// left alone either way; clearing the ID is the caller's job.
    pub async fn delete_image(&self) -> Result<bool, CloudError> {
        let Some(id) = self.image.status.image_id.as_ref() else {
            return Ok(false);
        };
        self.delete_remote_image(id).await?;
        Ok(true)
    }

    /// Delete the image carrying the resource's name when no ID was recorded.
    ///
    /// Covers an import that finished before any pass saw the image. The
    /// lookup follows the same first-match rule as `ensure_image`. Returns
    /// `Ok(false)` when nothing by that name exists.
    pub async fn delete_untracked_image(&self) -> Result<bool, CloudError> {
        let Some(existing) = self.find_remote_image().await? else {
            return Ok(false);
        };
        tracing::info!(parent: &self.span, "Deleting unrecorded image {}", existing.id);
        self.delete_remote_image(&existing.id).await?;
        Ok(true)
    }

    async fn delete_remote_image(&self, id: &ImageId) -> Result<(), CloudError> {
        let name = self.image.name.as_str();

        match self.client.delete_image(id).await {
            Ok(()) => {}
            // Gone already, typically removed by an earlier abandoned pass.
            Err(e) if e.is_not_found() => {
                tracing::debug!(parent: &self.span, "Image {} was already deleted", id);
            }
            Err(e) => {
                self.recorder.warn(
                    name,
                    Reason::FailedDeleteImage,
                    &format!("Failed image deletion - {}", e),
                );
                return Err(e);
            }
        }

        self.recorder.success(
            name,
            Reason::SuccessfulDeleteImage,
            &format!("Deleted image {:?}", id.as_str()),
        );
        Ok(())
    }

    /// Delete the tracked import job. Same contract as [`Self::delete_image`].
    pub async fn delete_import_job(&self) -> Result<bool, CloudError> {
        let Some(id) = self.image.status.job_id.as_ref() else {
            return Ok(false);
        };
        let name = self.image.name.as_str();

        match self.client.delete_job(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(parent: &self.span, "Import job {} was already deleted", id);
            }
            Err(e) => {
                self.recorder.warn(
                    name,
                    Reason::FailedDeleteImageImportJob,
                    &format!("Failed image import job deletion - {}", e),
                );
                return Err(e);
            }
        }

        self.recorder.success(
            name,
            Reason::SuccessfulDeleteImageImportJob,
            &format!("Deleted image import job {:?}", id.as_str()),
        );
        Ok(true)
    }

    /// First listed image whose name matches the resource.
    ///
    /// Names are expected to be unique per workspace. If they are not, listing
    /// order decides and the ignored duplicates are logged.
    async fn find_remote_image(&self) -> Result<Option<RemoteImage>, CloudError> {
        let name = self.image.name.as_str();

        let images = match self.client.list_images().await {
            Ok(images) => images,
            Err(e) => {
                self.recorder.warn(
                    name,
                    Reason::FailedRetrieveImage,
                    &format!("Failed to retrieve image {:?} - {}", name, e),
                );
                return Err(e);
            }
        };

        let mut matching = images.into_iter().filter(|img| img.name == name);
        let first = matching.next();

        if let Some(first) = &first {
            let duplicates: Vec<String> = matching.map(|img| img.id.into_inner()).collect();
            if !duplicates.is_empty() {
                tracing::warn!(
                    parent: &self.span,
                    "Found {} images named {}; using {} and ignoring {}",
                    duplicates.len() + 1,
                    name,
                    first.id,
                    duplicates.join(", ")
                );
            }
        }

        Ok(first)
    }

    /// [`Self::poll_job`] for callers that act on the answer: "not found"
    /// means no job, anything else warns and fails the pass.
    pub(crate) async fn last_import_job(&self) -> Result<Option<ImportJob>, CloudError> {
        match self.poll_job().await {
            Ok(job) => Ok(job),
            Err(e) => {
                self.recorder.warn(
                    self.image.name.as_str(),
                    Reason::FailedGetImageImportJob,
                    &format!("Failed to get image import job - {}", e),
                );
                Err(e)
            }
        }
    }
}
