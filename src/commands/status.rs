// ABOUTME: Status command implementation.
// ABOUTME: Prints stored image status and, for a single image, its event history.

use super::workspace::Workspace;
use cosimport::config::Config;
use cosimport::error::Result;
use cosimport::output::Output;
use cosimport::store::ImageStore;
use std::path::Path;

pub async fn status(config: &Config, cwd: &Path, name: Option<&str>, output: Output) -> Result<()> {
    let workspace = Workspace::open(config, cwd);

    let Some(name) = name else {
        let images = workspace.store.list().await?;
        if images.is_empty() {
            output.progress("No managed images");
        }
        for image in &images {
            output.image_status(image);
        }
        return Ok(());
    };

    let image = workspace.image(name).await?;
    output.image_status(&image);

    match workspace.journal.events_for(image.name.as_str()).await {
        Ok(events) => {
            if !events.is_empty() {
                output.progress("Events:");
            }
            for event in &events {
                output.event(event);
            }
        }
        Err(e) => output.warning(&format!(
            "failed to read {}: {e}",
            workspace.journal.path().display()
        )),
    }

    Ok(())
}
