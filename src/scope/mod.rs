// ABOUTME: Per-pass scope around one managed image.
// ABOUTME: Holds the in-memory resource, remote client, and store; persists once on close.

mod error;
mod import;

pub use error::{ScopeError, ScopeErrorKind};
pub use import::EnsureOutcome;

use futures::future::BoxFuture;
use snafu::{OptionExt, ResultExt};
use std::sync::Arc;
use tracing::Span;

use crate::cloud::{ClientFactory, CloudImageClient};
use crate::events::{EventRecorder, TracingRecorder};
use crate::resource::{ImageSpec, ImageStatus, ManagedImage};
use crate::store::ImageStore;
use crate::types::{ImageId, ImageName, ImageState, JobId};

use error::{ClientSetupSnafu, MissingImageSnafu, MissingStoreSnafu, PersistSnafu};

/// Inputs for opening a scope. `store` and `image` are required.
pub struct ScopeParams<S> {
    pub store: Option<Arc<S>>,
    pub image: Option<ManagedImage>,
    /// Span every log line of the pass is attached to.
    pub span: Option<Span>,
    pub recorder: Option<Arc<dyn EventRecorder>>,
}

impl<S> Default for ScopeParams<S> {
    fn default() -> Self {
        Self {
            store: None,
            image: None,
            span: None,
            recorder: None,
        }
    }
}

impl<S> ScopeParams<S> {
    pub fn new(store: Arc<S>, image: ManagedImage) -> Self {
        Self {
            store: Some(store),
            image: Some(image),
            ..Default::default()
        }
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }
}

/// One reconcile pass worth of state for a managed image.
///
/// All status setters only touch the in-memory copy. The copy is written back
/// by [`ImageScope::close`], which consumes the scope, so a pass can persist
/// at most once. [`ImageScope::with_scope`] guarantees the close also happens
/// when the pass body fails.
pub struct ImageScope<C, S> {
    image: ManagedImage,
    store: Arc<S>,
    client: C,
    recorder: Arc<dyn EventRecorder>,
    span: Span,
    closed: bool,
}

impl<C, S> std::fmt::Debug for ImageScope<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageScope")
            .field("image", &self.image)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<C: CloudImageClient, S: ImageStore> ImageScope<C, S> {
    /// Open a scope, building the remote client through `factory`.
    ///
    /// # Errors
    ///
    /// Returns `MissingStore` or `MissingImage` when a required handle is
    /// absent and `ClientSetup` when the factory cannot produce a client.
    pub async fn open<F>(params: ScopeParams<S>, factory: &F) -> Result<Self, ScopeError>
    where
        F: ClientFactory<Client = C>,
    {
        let store = params.store.context(MissingStoreSnafu)?;
        let image = params.image.context(MissingImageSnafu)?;

        let span = params
            .span
            .unwrap_or_else(|| tracing::info_span!("image", name = %image.name));
        let recorder = params
            .recorder
            .unwrap_or_else(|| Arc::new(TracingRecorder) as Arc<dyn EventRecorder>);

        let client = factory
            .build(&image.spec.service_instance_id)
            .await
            .context(ClientSetupSnafu {
                name: image.name.to_string(),
            })?;

        tracing::debug!(parent: &span, "Opened scope");

        Ok(Self {
            image,
            store,
            client,
            recorder,
            span,
            closed: false,
        })
    }

    /// Persist the resource and end the scope.
    pub async fn close(mut self) -> Result<(), ScopeError> {
        self.closed = true;
        self.store
            .persist(&self.image)
            .await
            .context(PersistSnafu {
                name: self.image.name.to_string(),
            })?;
        tracing::debug!(parent: &self.span, "Closed scope");
        Ok(())
    }

    /// Run `f` against the scope, then close it whatever `f` returned.
    ///
    /// If both the body and the close fail, the body's error is returned and
    /// the persist failure is logged.
    pub async fn with_scope<T, E, F>(mut self, f: F) -> Result<T, E>
    where
        F: for<'a> FnOnce(&'a mut Self) -> BoxFuture<'a, Result<T, E>>,
        E: From<ScopeError>,
    {
        let result = f(&mut self).await;
        let span = self.span.clone();

        match (result, self.close().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                tracing::warn!(parent: &span, "Failed to persist status after error: {}", close_err);
                Err(err)
            }
        }
    }
}

impl<C, S> ImageScope<C, S> {
    pub fn name(&self) -> &ImageName {
        &self.image.name
    }

    pub fn spec(&self) -> &ImageSpec {
        &self.image.spec
    }

    pub fn status(&self) -> &ImageStatus {
        &self.image.status
    }

    pub fn image(&self) -> &ManagedImage {
        &self.image
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn recorder(&self) -> &dyn EventRecorder {
        self.recorder.as_ref()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn request_deletion(&mut self) {
        self.image.request_deletion();
    }

    pub fn set_ready(&mut self) {
        self.image.status.ready = true;
    }

    pub fn set_not_ready(&mut self) {
        self.image.status.ready = false;
    }

    pub fn is_ready(&self) -> bool {
        self.image.status.ready
    }

    pub fn set_image_id(&mut self, id: ImageId) {
        self.image.status.image_id = Some(id);
    }

    pub fn clear_image_id(&mut self) {
        self.image.status.image_id = None;
    }

    pub fn image_id(&self) -> Option<&ImageId> {
        self.image.status.image_id.as_ref()
    }

    pub fn set_image_state(&mut self, state: ImageState) {
        self.image.status.image_state = state;
    }

    pub fn image_state(&self) -> ImageState {
        self.image.status.image_state
    }

    pub fn set_job_id(&mut self, id: JobId) {
        self.image.status.job_id = Some(id);
    }

    pub fn clear_job_id(&mut self) {
        self.image.status.job_id = None;
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.image.status.job_id.as_ref()
    }
}

impl<C, S> Drop for ImageScope<C, S> {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(
                parent: &self.span,
                "Scope for {} dropped without close, status changes were discarded",
                self.image.name
            );
        }
    }
}
