// ABOUTME: Reconcile driver that turns controller outcomes into image status.
// ABOUTME: One pass per call; the scope is persisted exactly once at the end.

use std::sync::Arc;

use crate::cloud::{ClientFactory, CloudImageClient};
use crate::error::Result;
use crate::events::{EventRecorder, Reason};
use crate::resource::ManagedImage;
use crate::scope::{EnsureOutcome, ImageScope, ScopeParams};
use crate::store::ImageStore;
use crate::types::{ImageId, ImageState, JobId, JobState};

/// Knobs for a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Submit a fresh import when the tracked job failed. When false the
    /// failure is reported and the image is left in the `failed` state.
    pub retry_failed_imports: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            retry_failed_imports: true,
        }
    }
}

/// What a pass concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The image exists remotely and is tracked.
    Ready(ImageId),
    /// An import job is running; run another pass later.
    Importing(JobId),
    /// The tracked import job failed and retries are disabled.
    ImportFailed { job: JobId, message: String },
    /// Remote objects were released after a deletion request.
    Finalized,
}

impl PassOutcome {
    /// Whether the scheduler should come back for another pass.
    pub fn needs_requeue(&self) -> bool {
        matches!(self, PassOutcome::Importing(_))
    }
}

/// Drive one pass for an open scope.
///
/// Resources marked for deletion are finalized. Otherwise `ensure_image`
/// decides and its outcome is folded into the status:
///
/// - `Found`: image ID recorded, state `available`, ready.
/// - `Pending`: state `importing`. The running job is not recorded: the
///   instance's latest job may belong to another image, and a recorded job is
///   deleted on finalize.
/// - `Created`: job ID recorded, state `importing`.
///
/// `ready` and the image ID are only ever set together here, and only cleared
/// together in [`finalize`].
pub async fn reconcile<C, S>(
    scope: &mut ImageScope<C, S>,
    options: ReconcileOptions,
) -> Result<PassOutcome>
where
    C: CloudImageClient,
    S: ImageStore,
{
    if scope.image().is_deleting() {
        return finalize(scope).await;
    }

    if !options.retry_failed_imports
        && let Some(outcome) = check_failed_import(scope).await?
    {
        return Ok(outcome);
    }

    match scope.ensure_image().await? {
        EnsureOutcome::Found(image) => {
            scope.set_image_id(image.id.clone());
            scope.set_image_state(ImageState::Available);
            scope.set_ready();
            Ok(PassOutcome::Ready(image.id))
        }
        EnsureOutcome::Pending(job) => {
            scope.set_image_state(ImageState::Importing);
            Ok(PassOutcome::Importing(job.id))
        }
        EnsureOutcome::Created(job_ref) => {
            scope.set_job_id(job_ref.id.clone());
            scope.set_image_state(ImageState::Importing);
            Ok(PassOutcome::Importing(job_ref.id))
        }
    }
}

/// Report a failed tracked job instead of replacing it.
async fn check_failed_import<C, S>(scope: &mut ImageScope<C, S>) -> Result<Option<PassOutcome>>
where
    C: CloudImageClient,
    S: ImageStore,
{
    let Some(tracked) = scope.job_id().cloned() else {
        return Ok(None);
    };
    if scope.image_state() == ImageState::Available {
        return Ok(None);
    }

    let Some(job) = scope.last_import_job().await? else {
        return Ok(None);
    };
    // The instance's latest job may belong to another image.
    if job.id != tracked || job.state != JobState::Failed {
        return Ok(None);
    }

    let message = job
        .message
        .unwrap_or_else(|| "no reason reported".to_string());
    scope.set_image_state(ImageState::Failed);
    scope.recorder().warn(
        scope.name().as_str(),
        Reason::ImageImportFailed,
        &format!("Image import job {:?} failed - {}", tracked.as_str(), message),
    );

    Ok(Some(PassOutcome::ImportFailed {
        job: tracked,
        message,
    }))
}

/// Release the remote image and import job of a resource being deleted.
///
/// Each ID is cleared only after its delete was confirmed. The first failure
/// stops the pass with that field (and everything after it) untouched, so the
/// next pass retries from the same point. With no image ID recorded, an image
/// carrying the resource's name is looked up and deleted instead, since its
/// import may have finished after the last pass.
pub async fn finalize<C, S>(scope: &mut ImageScope<C, S>) -> Result<PassOutcome>
where
    C: CloudImageClient,
    S: ImageStore,
{
    if scope.image_id().is_none() {
        scope.delete_untracked_image().await?;
    } else if scope.delete_image().await? {
        scope.clear_image_id();
    }
    scope.set_not_ready();

    if scope.delete_import_job().await? {
        scope.clear_job_id();
    }

    scope.set_image_state(ImageState::Unknown);
    Ok(PassOutcome::Finalized)
}

/// Open a scope for `image`, run one pass, and persist the result once.
pub async fn run_pass<F, S>(
    store: Arc<S>,
    image: ManagedImage,
    factory: &F,
    recorder: Arc<dyn EventRecorder>,
    options: ReconcileOptions,
) -> Result<PassOutcome>
where
    F: ClientFactory,
    S: ImageStore,
{
    let span = tracing::info_span!("reconcile", image = %image.name);
    let params = ScopeParams::new(store, image)
        .span(span)
        .recorder(recorder);

    let scope = ImageScope::open(params, factory).await?;
    scope
        .with_scope(move |scope| Box::pin(reconcile(scope, options)))
        .await
}
