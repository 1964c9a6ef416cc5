// ABOUTME: Persistence for managed images.
// ABOUTME: The scope reads one record at open and writes it back once at close.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::resource::ManagedImage;
use crate::types::ImageName;

/// Backing store for managed images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Fetch a managed image by name.
    async fn get(&self, name: &ImageName) -> Result<Option<ManagedImage>, StoreError>;

    /// Write the whole resource (spec and status) as one atomic update.
    async fn persist(&self, image: &ManagedImage) -> Result<(), StoreError>;

    /// All stored images, ordered by name.
    async fn list(&self) -> Result<Vec<ManagedImage>, StoreError>;

    /// Drop a record. Removing a missing record is not an error.
    async fn remove(&self, name: &ImageName) -> Result<(), StoreError>;
}

/// Errors from the status store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt record {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode {name}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
