// ABOUTME: Local state shared by the commands: status store, event journal, client factory.
// ABOUTME: Resolves the state directory from the config and the working directory.

use cosimport::cloud::HttpClientFactory;
use cosimport::config::Config;
use cosimport::error::{Error, Result};
use cosimport::events::JournalRecorder;
use cosimport::resource::ManagedImage;
use cosimport::store::{FileStore, ImageStore};
use cosimport::types::ImageName;
use std::path::Path;
use std::sync::Arc;

pub struct Workspace {
    pub store: Arc<FileStore>,
    pub journal: Arc<JournalRecorder>,
}

impl Workspace {
    pub fn open(config: &Config, cwd: &Path) -> Self {
        let state_dir = config.state_dir_in(cwd);
        tracing::debug!("Using state directory {}", state_dir.display());
        Self {
            store: Arc::new(FileStore::new(&state_dir)),
            journal: Arc::new(JournalRecorder::new(&state_dir)),
        }
    }

    /// Stored image by name, or `ImageNotFound`.
    pub async fn image(&self, name: &str) -> Result<ManagedImage> {
        let name = parse_name(name)?;
        self.store
            .get(&name)
            .await?
            .ok_or_else(|| Error::ImageNotFound(name.to_string()))
    }

    /// Write out the events recorded by the last pass. Journal failures are
    /// only logged.
    pub async fn flush_events(&self) {
        if let Err(e) = self.journal.flush().await {
            tracing::debug!(
                "Failed to append events to {}: {}",
                self.journal.path().display(),
                e
            );
        }
    }
}

pub fn parse_name(name: &str) -> Result<ImageName> {
    ImageName::new(name).map_err(|e| Error::InvalidManifest(format!("name: {e}")))
}

/// Client factory for the configured cloud account.
pub fn client_factory(config: &Config) -> Result<HttpClientFactory> {
    Ok(HttpClientFactory::new(config.cloud.settings()?))
}
