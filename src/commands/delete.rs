// ABOUTME: Delete command implementation.
// ABOUTME: Marks the image for deletion, finalizes it, and drops the record once released.

use super::workspace::{Workspace, client_factory};
use cosimport::config::Config;
use cosimport::error::Result;
use cosimport::events::EventRecorder;
use cosimport::output::Output;
use cosimport::reconcile::run_pass;
use cosimport::store::ImageStore;
use std::path::Path;
use std::sync::Arc;

pub async fn delete(config: &Config, cwd: &Path, name: &str, mut output: Output) -> Result<()> {
    let workspace = Workspace::open(config, cwd);
    let factory = client_factory(config)?;
    let recorder: Arc<dyn EventRecorder> = workspace.journal.clone();

    output.start_timer();

    let mut image = workspace.image(name).await?;
    if !image.is_deleting() {
        image.request_deletion();
        // Recorded up front so the request survives a pass that never opens.
        workspace.store.persist(&image).await?;
    }

    output.progress(&format!("Releasing remote objects of {name}..."));
    let result = run_pass(
        workspace.store.clone(),
        image,
        &factory,
        recorder,
        config.reconcile_options(),
    )
    .await;
    workspace.flush_events().await;
    result?;

    let image = workspace.image(name).await?;
    if image.is_fully_released() {
        workspace.store.remove(&image.name).await?;
        output.success(&format!("{name} deleted"));
    } else {
        output.warning(&format!(
            "{name} still tracks remote objects; run delete again to retry"
        ));
    }

    Ok(())
}
