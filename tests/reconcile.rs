// ABOUTME: Integration tests for full reconcile passes against the fake cloud.
// ABOUTME: End-to-end import and delete flows plus a property test of the status invariant.

mod support;

use cosimport::cloud::{BucketAccess, CloudError};
use cosimport::error::Error;
use cosimport::events::{EventRecorder, Reason};
use cosimport::reconcile::{PassOutcome, ReconcileOptions, run_pass};
use cosimport::resource::ManagedImage;
use cosimport::scope::ScopeErrorKind;
use cosimport::store::ImageStore;
use cosimport::types::{ImageState, JobState};
use proptest::prelude::*;
use support::{FakeCloud, FakeFactory, Harness, boot_img, image_id, job_id};

impl Harness {
    async fn pass(&self, image: &ManagedImage, options: ReconcileOptions) -> Result<PassOutcome, Error> {
        let current = self.store.get(&image.name).await.unwrap().unwrap();
        run_pass(
            self.store.clone(),
            current,
            &self.factory(),
            self.recorder(),
            options,
        )
        .await
    }

    async fn request_deletion(&self, image: &ManagedImage) {
        let mut current = self.stored(image);
        current.request_deletion();
        self.store.persist(&current).await.unwrap();
    }
}

fn retrying() -> ReconcileOptions {
    ReconcileOptions::default()
}

fn not_retrying() -> ReconcileOptions {
    ReconcileOptions {
        retry_failed_imports: false,
    }
}

mod import_flow {
    use super::*;

    #[tokio::test]
    async fn boot_img_first_pass_submits_one_import() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);

        let outcome = h.pass(&image, retrying()).await.unwrap();

        assert_eq!(outcome, PassOutcome::Importing(job_id("job-1")));
        assert!(outcome.needs_requeue());

        let state = h.cloud.state();
        assert_eq!(state.created.len(), 1);
        let request = &state.created[0];
        assert_eq!(request.image_name.as_str(), "boot-img");
        assert_eq!(request.bucket_name, "b1");
        assert_eq!(request.image_filename, "o1");
        assert_eq!(request.region, "us-south");
        assert_eq!(request.storage_type, "tier1");
        assert_eq!(request.bucket_access, BucketAccess::Public);
        drop(state);

        let stored = h.stored(&image);
        assert_eq!(stored.status.job_id, Some(job_id("job-1")));
        assert_eq!(stored.status.image_state, ImageState::Importing);
        assert!(!stored.status.ready);
        assert_eq!(stored.status.image_id, None);
        assert_eq!(h.store.persist_count(), 1);
    }

    #[tokio::test]
    async fn import_runs_to_ready() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);

        h.pass(&image, retrying()).await.unwrap();
        let again = h.pass(&image, retrying()).await.unwrap();
        assert_eq!(again, PassOutcome::Importing(job_id("job-1")));
        assert_eq!(h.cloud.create_calls(), 1);

        h.cloud.complete_import("img-42");
        let done = h.pass(&image, retrying()).await.unwrap();

        assert_eq!(done, PassOutcome::Ready(image_id("img-42")));
        assert!(!done.needs_requeue());
        let stored = h.stored(&image);
        assert!(stored.status.ready);
        assert_eq!(stored.status.image_id, Some(image_id("img-42")));
        assert_eq!(stored.status.image_state, ImageState::Available);
        assert_eq!(h.cloud.create_calls(), 1);
        assert_eq!(h.store.persist_count(), 3);
    }

    #[tokio::test]
    async fn running_job_of_another_image_is_never_claimed() {
        let image = boot_img();
        let h = Harness::new(
            FakeCloud::new().with_job("job-other", JobState::InProgress),
            &image,
        );

        let outcome = h.pass(&image, retrying()).await.unwrap();

        assert_eq!(outcome, PassOutcome::Importing(job_id("job-other")));
        let stored = h.stored(&image);
        assert_eq!(stored.status.job_id, None);
        assert_eq!(stored.status.image_state, ImageState::Importing);
        assert_eq!(h.cloud.create_calls(), 0);

        h.request_deletion(&image).await;
        let outcome = h.pass(&image, retrying()).await.unwrap();

        assert_eq!(outcome, PassOutcome::Finalized);
        assert!(h.stored(&image).is_fully_released());
        let state = h.cloud.state();
        assert!(state.deleted_jobs.is_empty());
        assert_eq!(
            state.job.as_ref().map(|job| job.id.clone()),
            Some(job_id("job-other"))
        );
    }

    #[tokio::test]
    async fn failed_import_is_retried_by_default() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);
        h.pass(&image, retrying()).await.unwrap();
        h.cloud
            .set_job("job-1", JobState::Failed, Some("object not found in bucket"));

        let outcome = h.pass(&image, retrying()).await.unwrap();

        assert_eq!(outcome, PassOutcome::Importing(job_id("job-2")));
        assert_eq!(h.stored(&image).status.job_id, Some(job_id("job-2")));
        assert_eq!(h.cloud.create_calls(), 2);
    }

    #[tokio::test]
    async fn failed_import_is_reported_when_retry_disabled() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);
        h.pass(&image, not_retrying()).await.unwrap();
        h.cloud
            .set_job("job-1", JobState::Failed, Some("object not found in bucket"));
        h.recorder.clear();

        let outcome = h.pass(&image, not_retrying()).await.unwrap();

        assert_eq!(
            outcome,
            PassOutcome::ImportFailed {
                job: job_id("job-1"),
                message: "object not found in bucket".to_string(),
            }
        );
        assert!(!outcome.needs_requeue());
        assert_eq!(h.cloud.create_calls(), 1);
        assert_eq!(h.stored(&image).status.image_state, ImageState::Failed);
        let warnings = h.recorder.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].reason, Reason::ImageImportFailed);
        assert!(warnings[0].message.contains("object not found in bucket"));
    }

    #[tokio::test]
    async fn job_lookup_failure_warns_when_retry_disabled() {
        let mut image = boot_img();
        image.status.job_id = Some(job_id("job-1"));
        image.status.image_state = ImageState::Importing;
        let cloud = FakeCloud::new().with_job("job-1", JobState::InProgress);
        cloud.state().fail_get_job = Some(CloudError::Api {
            status: 500,
            message: "internal error".to_string(),
        });
        let h = Harness::new(cloud, &image);

        let err = h.pass(&image, not_retrying()).await.unwrap_err();

        assert!(matches!(err, Error::Cloud(CloudError::Api { status: 500, .. })));
        assert_eq!(h.cloud.create_calls(), 0);
        let warnings = h.recorder.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].reason, Reason::FailedGetImageImportJob);
        assert!(warnings[0].message.contains("internal error"));
        assert_eq!(h.stored(&image).status, image.status);
    }

    #[tokio::test]
    async fn other_images_failed_job_does_not_block() {
        // The instance's latest job belongs to something else.
        let mut image = boot_img();
        image.status.job_id = Some(job_id("job-mine"));
        image.status.image_state = ImageState::Importing;
        let h = Harness::new(
            FakeCloud::new().with_job("job-other", JobState::Failed),
            &image,
        );

        let outcome = h.pass(&image, not_retrying()).await.unwrap();

        assert!(matches!(outcome, PassOutcome::Importing(_)));
        assert_eq!(h.cloud.create_calls(), 1);
    }

    #[tokio::test]
    async fn remote_failure_still_persists_once() {
        let image = boot_img();
        let cloud = FakeCloud::new();
        cloud.state().fail_list = Some(CloudError::Transport("timeout".to_string()));
        let h = Harness::new(cloud, &image);

        let err = h.pass(&image, retrying()).await.unwrap_err();

        assert!(matches!(err, Error::Cloud(CloudError::Transport(_))));
        assert_eq!(h.store.persist_count(), 1);
        assert_eq!(h.stored(&image).status, image.status);
    }

    #[tokio::test]
    async fn client_setup_failure_persists_nothing() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);
        let factory = FakeFactory::failing(CloudError::Setup("failed to get region for zone".to_string()));
        let recorder: std::sync::Arc<dyn EventRecorder> = h.recorder.clone();

        let err = run_pass(h.store.clone(), image.clone(), &factory, recorder, retrying())
            .await
            .unwrap_err();

        match err {
            Error::Scope(scope_err) => assert_eq!(scope_err.kind(), ScopeErrorKind::ClientSetup),
            other => panic!("expected scope error, got {other:?}"),
        }
        assert_eq!(h.store.persist_count(), 0);
        assert!(h.recorder.events().is_empty());
    }
}

mod delete_flow {
    use super::*;

    async fn ready_image(h: &Harness, image: &ManagedImage) {
        h.pass(image, retrying()).await.unwrap();
        h.cloud.complete_import("img-42");
        h.pass(image, retrying()).await.unwrap();
    }

    #[tokio::test]
    async fn delete_round_trip() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);
        ready_image(&h, &image).await;
        h.request_deletion(&image).await;
        h.recorder.clear();

        let outcome = h.pass(&image, retrying()).await.unwrap();

        assert_eq!(outcome, PassOutcome::Finalized);
        let stored = h.stored(&image);
        assert!(!stored.status.ready);
        assert_eq!(stored.status.image_id, None);
        assert_eq!(stored.status.job_id, None);
        assert_eq!(stored.status.image_state, ImageState::Unknown);
        assert!(stored.is_fully_released());
        assert_eq!(h.cloud.state().deleted_images, vec![image_id("img-42")]);
        assert_eq!(h.cloud.state().deleted_jobs, vec![job_id("job-1")]);
        assert_eq!(
            h.recorder.reasons(),
            vec![
                Reason::SuccessfulDeleteImage,
                Reason::SuccessfulDeleteImageImportJob
            ]
        );
    }

    #[tokio::test]
    async fn failed_image_delete_keeps_ids() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);
        ready_image(&h, &image).await;
        h.request_deletion(&image).await;
        h.cloud.state().fail_delete_image = Some(CloudError::Api {
            status: 409,
            message: "image attached to instance".to_string(),
        });

        let err = h.pass(&image, retrying()).await.unwrap_err();

        assert!(matches!(err, Error::Cloud(CloudError::Api { status: 409, .. })));
        let stored = h.stored(&image);
        assert_eq!(stored.status.image_id, Some(image_id("img-42")));
        assert!(stored.status.ready);
        assert_eq!(stored.status.job_id, Some(job_id("job-1")));
        assert!(h.cloud.state().deleted_jobs.is_empty());

        h.cloud.state().fail_delete_image = None;
        let outcome = h.pass(&image, retrying()).await.unwrap();
        assert_eq!(outcome, PassOutcome::Finalized);
        assert!(h.stored(&image).is_fully_released());
    }

    #[tokio::test]
    async fn failed_job_delete_clears_image_only() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);
        ready_image(&h, &image).await;
        h.request_deletion(&image).await;
        h.cloud.state().fail_delete_job = Some(CloudError::Unauthorized("token expired".to_string()));

        h.pass(&image, retrying()).await.unwrap_err();

        let stored = h.stored(&image);
        assert_eq!(stored.status.image_id, None);
        assert!(!stored.status.ready);
        assert_eq!(stored.status.job_id, Some(job_id("job-1")));
        assert!(!stored.is_fully_released());
    }

    #[tokio::test]
    async fn finished_import_not_yet_recorded_is_deleted() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);
        h.pass(&image, retrying()).await.unwrap();
        h.cloud.complete_import("img-42");
        h.request_deletion(&image).await;
        h.recorder.clear();

        let outcome = h.pass(&image, retrying()).await.unwrap();

        assert_eq!(outcome, PassOutcome::Finalized);
        assert!(h.stored(&image).is_fully_released());
        let state = h.cloud.state();
        assert!(state.images.iter().all(|img| img.name != "boot-img"));
        assert_eq!(state.deleted_images, vec![image_id("img-42")]);
        assert_eq!(state.deleted_jobs, vec![job_id("job-1")]);
        drop(state);
        assert_eq!(
            h.recorder.reasons(),
            vec![
                Reason::SuccessfulDeleteImage,
                Reason::SuccessfulDeleteImageImportJob
            ]
        );
    }

    #[tokio::test]
    async fn unrecorded_image_lookup_failure_keeps_job() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);
        h.pass(&image, retrying()).await.unwrap();
        h.request_deletion(&image).await;
        h.cloud.state().fail_list = Some(CloudError::Transport("timeout".to_string()));
        h.recorder.clear();

        let err = h.pass(&image, retrying()).await.unwrap_err();

        assert!(matches!(err, Error::Cloud(CloudError::Transport(_))));
        assert_eq!(h.stored(&image).status.job_id, Some(job_id("job-1")));
        assert!(h.cloud.state().deleted_jobs.is_empty());
        assert_eq!(h.recorder.reasons(), vec![Reason::FailedRetrieveImage]);
    }

    #[tokio::test]
    async fn deleting_never_imports() {
        let image = boot_img();
        let h = Harness::new(FakeCloud::new(), &image);
        h.request_deletion(&image).await;

        let outcome = h.pass(&image, retrying()).await.unwrap();

        assert_eq!(outcome, PassOutcome::Finalized);
        assert_eq!(h.cloud.create_calls(), 0);
        // Only the lookup for an unrecorded image.
        assert_eq!(h.cloud.state().list_calls, 1);
        assert_eq!(h.cloud.state().get_job_calls, 0);
        assert!(h.recorder.events().is_empty());
    }
}

#[derive(Debug, Clone)]
enum Step {
    Pass { retry: bool },
    CompleteImport,
    FailImport,
    ListOutage(bool),
    DeleteBlocked(bool),
    RequestDeletion,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => any::<bool>().prop_map(|retry| Step::Pass { retry }),
        2 => Just(Step::CompleteImport),
        1 => Just(Step::FailImport),
        1 => any::<bool>().prop_map(Step::ListOutage),
        1 => any::<bool>().prop_map(Step::DeleteBlocked),
        1 => Just(Step::RequestDeletion),
    ]
}

fn running_job(cloud: &FakeCloud) -> bool {
    cloud
        .state()
        .job
        .as_ref()
        .is_some_and(|job| !job.state.is_terminal())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stored_status_stays_consistent(steps in proptest::collection::vec(step(), 1..24)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let image = boot_img();
            let h = Harness::new(FakeCloud::new(), &image);
            let mut images = 0;

            for step in steps {
                match step {
                    Step::Pass { retry } => {
                        let was_running = running_job(&h.cloud);
                        let created = h.cloud.create_calls();
                        let options = ReconcileOptions { retry_failed_imports: retry };
                        let outcome = h.pass(&image, options).await;
                        if was_running {
                            prop_assert_eq!(h.cloud.create_calls(), created);
                        }
                        if matches!(outcome, Ok(PassOutcome::Finalized))
                            && h.stored(&image).is_fully_released()
                        {
                            let leftover: Vec<_> = h
                                .cloud
                                .state()
                                .images
                                .iter()
                                .filter(|img| img.name == "boot-img")
                                .map(|img| img.id.clone())
                                .collect();
                            prop_assert!(leftover.is_empty(), "untracked images left behind: {:?}", leftover);
                        }
                    }
                    Step::CompleteImport => {
                        if running_job(&h.cloud) {
                            images += 1;
                            h.cloud.complete_import(&format!("img-{images}"));
                        }
                    }
                    Step::FailImport => {
                        if running_job(&h.cloud) {
                            let id = h.cloud.state().job.as_ref().map(|job| job.id.clone());
                            if let Some(id) = id {
                                h.cloud.set_job(id.as_str(), JobState::Failed, Some("import failed"));
                            }
                        }
                    }
                    Step::ListOutage(on) => {
                        h.cloud.state().fail_list =
                            on.then(|| CloudError::Transport("outage".to_string()));
                    }
                    Step::DeleteBlocked(on) => {
                        h.cloud.state().fail_delete_image = on.then(|| CloudError::Api {
                            status: 409,
                            message: "in use".to_string(),
                        });
                    }
                    Step::RequestDeletion => h.request_deletion(&image).await,
                }

                let stored = h.stored(&image);
                prop_assert!(
                    stored.status.is_consistent(),
                    "inconsistent status {:?}",
                    stored.status
                );
            }
            Ok(())
        })?;
    }
}
