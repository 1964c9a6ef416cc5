// ABOUTME: The managed image resource: desired spec plus controller-owned status.
// ABOUTME: Parsed from YAML manifests and persisted by the status store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{ImageId, ImageName, ImageState, JobId, ServiceInstanceId};

/// Storage tier used when a manifest does not name one.
pub const DEFAULT_STORAGE_TYPE: &str = "tier1";

/// Where the image comes from and where it should land. Fixed once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub service_instance_id: ServiceInstanceId,
    pub bucket: String,
    pub object: String,
    pub region: String,
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
}

fn default_storage_type() -> String {
    DEFAULT_STORAGE_TYPE.to_string()
}

/// Observed state, written only by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<ImageId>,
    #[serde(default)]
    pub image_state: ImageState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

impl ImageStatus {
    /// `ready` must hold exactly when an image ID is tracked.
    pub fn is_consistent(&self) -> bool {
        self.ready == self.image_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedImage {
    pub name: ImageName,
    pub spec: ImageSpec,
    #[serde(default)]
    pub status: ImageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_requested_at: Option<DateTime<Utc>>,
}

impl ManagedImage {
    pub fn new(name: ImageName, spec: ImageSpec) -> Self {
        Self {
            name,
            spec,
            status: ImageStatus::default(),
            deletion_requested_at: None,
        }
    }

    /// Parse a manifest. Any `status` block in the manifest is discarded.
    pub fn from_manifest_yaml(yaml: &str) -> Result<Self> {
        let mut image: ManagedImage = serde_yaml::from_str(yaml)?;
        image.status = ImageStatus::default();
        image.deletion_requested_at = None;
        image.validate()?;
        Ok(image)
    }

    pub fn load_manifest(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_manifest_yaml(&content)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("bucket", &self.spec.bucket),
            ("object", &self.spec.object),
            ("region", &self.spec.region),
            ("storage_type", &self.spec.storage_type),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidManifest(format!("spec.{field} cannot be empty")));
            }
        }
        Ok(())
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_requested_at.is_some()
    }

    pub fn request_deletion(&mut self) {
        if self.deletion_requested_at.is_none() {
            self.deletion_requested_at = Some(Utc::now());
        }
    }

    /// True once every remote object this resource tracked has been removed.
    pub fn is_fully_released(&self) -> bool {
        self.status.image_id.is_none() && self.status.job_id.is_none()
    }
}
