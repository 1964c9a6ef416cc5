// ABOUTME: Test support utilities.
// ABOUTME: Provides an in-memory fake of the cloud image service and fixture builders.

use async_trait::async_trait;
use cosimport::cloud::{
    ClientFactory, CloudError, CloudImageClient, ImportJob, ImportJobRequest, JobRef, RemoteImage,
};
use cosimport::events::{EventRecorder, MemoryRecorder};
use cosimport::resource::{DEFAULT_STORAGE_TYPE, ImageSpec, ManagedImage};
use cosimport::scope::{ImageScope, ScopeParams};
use cosimport::store::MemoryStore;
use cosimport::types::{ImageId, ImageName, JobId, JobState, ServiceInstanceId};
use parking_lot::Mutex;
use std::sync::{Arc, Once};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("cosimport=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const INSTANCE: &str = "7845d372-d4e1-46b8-91fc-41051c984601";

/// The `boot-img` resource used throughout the tests.
#[allow(dead_code)]
pub fn boot_img() -> ManagedImage {
    managed_image("boot-img")
}

#[allow(dead_code)]
pub fn managed_image(name: &str) -> ManagedImage {
    ManagedImage::new(
        ImageName::new(name).unwrap(),
        ImageSpec {
            service_instance_id: ServiceInstanceId::new(INSTANCE).unwrap(),
            bucket: "b1".to_string(),
            object: "o1".to_string(),
            region: "us-south".to_string(),
            storage_type: DEFAULT_STORAGE_TYPE.to_string(),
        },
    )
}

#[allow(dead_code)]
pub fn remote_image(name: &str, id: &str) -> RemoteImage {
    RemoteImage {
        name: name.to_string(),
        id: ImageId::new(id).unwrap(),
        state: Some("active".to_string()),
    }
}

#[allow(dead_code)]
pub fn job_id(id: &str) -> JobId {
    JobId::new(id).unwrap()
}

#[allow(dead_code)]
pub fn image_id(id: &str) -> ImageId {
    ImageId::new(id).unwrap()
}

/// Remote state and call log behind a `FakeCloud`.
#[derive(Debug, Default)]
pub struct CloudState {
    pub images: Vec<RemoteImage>,
    /// Latest import job of the service instance.
    pub job: Option<ImportJob>,
    pub created: Vec<ImportJobRequest>,
    pub deleted_images: Vec<ImageId>,
    pub deleted_jobs: Vec<JobId>,
    pub list_calls: usize,
    pub get_job_calls: usize,
    pub fail_list: Option<CloudError>,
    pub fail_get_job: Option<CloudError>,
    pub fail_create: Option<CloudError>,
    pub fail_delete_image: Option<CloudError>,
    pub fail_delete_job: Option<CloudError>,
    next_job: usize,
}

/// In-memory cloud. Clones share state, so a test keeps one handle while
/// the scope owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

#[allow(dead_code)]
impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, name: &str, id: &str) -> Self {
        self.state.lock().images.push(remote_image(name, id));
        self
    }

    pub fn with_job(self, id: &str, state: JobState) -> Self {
        self.set_job(id, state, None);
        self
    }

    pub fn set_job(&self, id: &str, state: JobState, message: Option<&str>) {
        self.state.lock().job = Some(ImportJob {
            id: job_id(id),
            state,
            message: message.map(str::to_string),
        });
    }

    /// Finish the running job and publish the image it was importing.
    pub fn complete_import(&self, image_id: &str) {
        let mut state = self.state.lock();
        if let Some(job) = state.job.as_mut() {
            job.state = JobState::Completed;
        }
        if let Some(request) = state.created.last().cloned() {
            state
                .images
                .push(remote_image(request.image_name.as_str(), image_id));
        }
    }

    pub fn state(&self) -> parking_lot::MutexGuard<'_, CloudState> {
        self.state.lock()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().created.len()
    }
}

#[async_trait]
impl CloudImageClient for FakeCloud {
    async fn list_images(&self) -> Result<Vec<RemoteImage>, CloudError> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        if let Some(err) = state.fail_list.clone() {
            return Err(err);
        }
        Ok(state.images.clone())
    }

    async fn create_import_job(&self, request: &ImportJobRequest) -> Result<JobRef, CloudError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_create.clone() {
            return Err(err);
        }
        state.next_job += 1;
        let id = job_id(&format!("job-{}", state.next_job));
        state.created.push(request.clone());
        state.job = Some(ImportJob {
            id: id.clone(),
            state: JobState::Queued,
            message: None,
        });
        Ok(JobRef { id })
    }

    async fn get_import_job(
        &self,
        _instance: &ServiceInstanceId,
    ) -> Result<ImportJob, CloudError> {
        let mut state = self.state.lock();
        state.get_job_calls += 1;
        if let Some(err) = state.fail_get_job.clone() {
            return Err(err);
        }
        state
            .job
            .clone()
            .ok_or_else(|| CloudError::NotFound("no import job".to_string()))
    }

    async fn delete_image(&self, id: &ImageId) -> Result<(), CloudError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_delete_image.clone() {
            return Err(err);
        }
        let before = state.images.len();
        state.images.retain(|img| &img.id != id);
        if state.images.len() == before {
            return Err(CloudError::NotFound(format!("image {id}")));
        }
        state.deleted_images.push(id.clone());
        Ok(())
    }

    async fn delete_job(&self, id: &JobId) -> Result<(), CloudError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_delete_job.clone() {
            return Err(err);
        }
        let tracked = state.job.as_ref().is_some_and(|job| &job.id == id);
        if !tracked {
            return Err(CloudError::NotFound(format!("job {id}")));
        }
        state.job = None;
        state.deleted_jobs.push(id.clone());
        Ok(())
    }
}

/// Factory handing out clones of one `FakeCloud`.
#[derive(Debug, Clone, Default)]
pub struct FakeFactory {
    pub cloud: FakeCloud,
    pub fail: Option<CloudError>,
}

#[allow(dead_code)]
impl FakeFactory {
    pub fn new(cloud: FakeCloud) -> Self {
        Self { cloud, fail: None }
    }

    pub fn failing(err: CloudError) -> Self {
        Self {
            cloud: FakeCloud::new(),
            fail: Some(err),
        }
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    type Client = FakeCloud;

    async fn build(&self, _instance: &ServiceInstanceId) -> Result<FakeCloud, CloudError> {
        match &self.fail {
            Some(err) => Err(err.clone()),
            None => Ok(self.cloud.clone()),
        }
    }
}

/// Everything a scope test needs, wired together.
#[allow(dead_code)]
pub struct Harness {
    pub cloud: FakeCloud,
    pub store: Arc<MemoryStore>,
    pub recorder: Arc<MemoryRecorder>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(cloud: FakeCloud, image: &ManagedImage) -> Self {
        init_tracing();
        Self {
            cloud,
            store: Arc::new(MemoryStore::with_image(image.clone())),
            recorder: Arc::new(MemoryRecorder::new()),
        }
    }

    pub fn factory(&self) -> FakeFactory {
        FakeFactory::new(self.cloud.clone())
    }

    pub fn recorder(&self) -> Arc<dyn EventRecorder> {
        self.recorder.clone()
    }

    pub async fn open(&self, image: ManagedImage) -> ImageScope<FakeCloud, MemoryStore> {
        let params = ScopeParams::new(self.store.clone(), image).recorder(self.recorder());
        ImageScope::open(params, &self.factory()).await.unwrap()
    }

    /// Stored copy of `image`, as the last closed scope left it.
    pub fn stored(&self, image: &ManagedImage) -> ManagedImage {
        self.store.snapshot(&image.name).unwrap()
    }
}
