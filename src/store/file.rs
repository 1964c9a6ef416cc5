// ABOUTME: File-backed image store, one JSON document per managed image.
// ABOUTME: Writes go to a temp file first and are renamed into place.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{ImageStore, StoreError};
use crate::resource::ManagedImage;
use crate::types::ImageName;

const IMAGES_DIR: &str = "images";

/// Stores images under `<state_dir>/images/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            root: state_dir.join(IMAGES_DIR),
        }
    }

    fn record_path(&self, name: &ImageName) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }

    async fn read_record(path: &Path) -> Result<Option<ManagedImage>, StoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl ImageStore for FileStore {
    async fn get(&self, name: &ImageName) -> Result<Option<ManagedImage>, StoreError> {
        Self::read_record(&self.record_path(name)).await
    }

    async fn persist(&self, image: &ManagedImage) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(image).map_err(|source| StoreError::Encode {
            name: image.name.to_string(),
            source,
        })?;

        let path = self.record_path(&image.name);
        let tmp_path = path.with_extension("json.tmp");
        let write_err = |source: std::io::Error| StoreError::Write {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(write_err)?;
        tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
        // rename(2) replaces the old record atomically on the same filesystem
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(write_err)?;

        tracing::debug!("Persisted {} to {}", image.name, path.display());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ManagedImage>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut images = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| StoreError::Read {
                path: self.root.clone(),
                source,
            })?;
            let Some(entry) = entry else { break };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(image) = Self::read_record(&path).await? {
                images.push(image);
            }
        }

        images.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(images)
    }

    async fn remove(&self, name: &ImageName) -> Result<(), StoreError> {
        let path = self.record_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write { path, source }),
        }
    }
}
