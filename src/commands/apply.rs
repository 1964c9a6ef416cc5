// ABOUTME: Apply command implementation.
// ABOUTME: Registers a managed image from a manifest; specs cannot change afterwards.

use super::workspace::Workspace;
use cosimport::config::Config;
use cosimport::error::{Error, Result};
use cosimport::output::Output;
use cosimport::resource::ManagedImage;
use cosimport::store::ImageStore;
use std::path::Path;

pub async fn apply(config: &Config, cwd: &Path, file: &Path, output: Output) -> Result<()> {
    let manifest = ManagedImage::load_manifest(&cwd.join(file))?;
    let workspace = Workspace::open(config, cwd);

    match workspace.store.get(&manifest.name).await? {
        Some(existing) if existing.is_deleting() => Err(Error::InvalidManifest(format!(
            "{} is being deleted; wait for the delete to finish",
            existing.name
        ))),
        Some(existing) if existing.spec != manifest.spec => {
            Err(Error::SpecChanged(existing.name.to_string()))
        }
        Some(existing) => {
            output.success(&format!("{} unchanged", existing.name));
            Ok(())
        }
        None => {
            workspace.store.persist(&manifest).await?;
            tracing::info!("Registered managed image {}", manifest.name);
            output.success(&format!("{} created", manifest.name));
            Ok(())
        }
    }
}
