// ABOUTME: Application-wide error types for cosimport.
// ABOUTME: Aggregates cloud, scope, store, and configuration failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::cloud::CloudError;
use crate::scope::ScopeError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("managed image not found: {0}")]
    ImageNotFound(String),

    #[error("spec of {0} is immutable once applied")]
    SpecChanged(String),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
