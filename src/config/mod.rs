// ABOUTME: Configuration types and parsing for cosimport.yml.
// ABOUTME: Handles YAML parsing, discovery, and secret resolution for the cloud block.

mod env_value;
mod init;

pub use env_value::EnvValue;
pub use init::{MANIFEST_EXAMPLE_FILENAME, init_config};

use crate::cloud::{CloudSettings, DEFAULT_IAM_ENDPOINT, DEFAULT_RESOURCE_CONTROLLER_ENDPOINT};
use crate::error::{Error, Result};
use crate::reconcile::ReconcileOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "cosimport.yml";
pub const CONFIG_FILENAME_ALT: &str = "cosimport.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".cosimport/config.yml";

pub const DEFAULT_STATE_DIR: &str = ".cosimport/state";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    pub cloud: CloudConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    pub api_key: EnvValue,
    pub account: EnvValue,

    #[serde(default)]
    pub zone: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_iam_endpoint")]
    pub iam_endpoint: String,

    #[serde(default = "default_resource_controller_endpoint")]
    pub resource_controller_endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_requeue_after", with = "humantime_serde")]
    pub requeue_after: Duration,

    #[serde(default = "default_retry_failed_imports")]
    pub retry_failed_imports: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            requeue_after: default_requeue_after(),
            retry_failed_imports: default_retry_failed_imports(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

fn default_iam_endpoint() -> String {
    DEFAULT_IAM_ENDPOINT.to_string()
}

fn default_resource_controller_endpoint() -> String {
    DEFAULT_RESOURCE_CONTROLLER_ENDPOINT.to_string()
}

fn default_requeue_after() -> Duration {
    Duration::from_secs(30)
}

fn default_retry_failed_imports() -> bool {
    true
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// State directory, relative paths taken from `base`.
    pub fn state_dir_in(&self, base: &Path) -> PathBuf {
        if self.state_dir.is_absolute() {
            self.state_dir.clone()
        } else {
            base.join(&self.state_dir)
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            retry_failed_imports: self.reconcile.retry_failed_imports,
        }
    }
}

impl CloudConfig {
    /// Resolve secrets from the environment into client settings.
    pub fn settings(&self) -> Result<CloudSettings> {
        let api_key = self.api_key.resolve()?;
        if api_key.trim().is_empty() {
            return Err(Error::InvalidConfig("cloud.api_key cannot be empty".to_string()));
        }

        Ok(CloudSettings {
            api_key,
            account: self.account.resolve()?,
            zone: self.zone.clone().filter(|z| !z.trim().is_empty()),
            endpoint: self.endpoint.clone().filter(|e| !e.trim().is_empty()),
            iam_endpoint: self.iam_endpoint.clone(),
            resource_controller_endpoint: self.resource_controller_endpoint.clone(),
        })
    }
}
