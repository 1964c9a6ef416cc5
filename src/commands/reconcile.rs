// ABOUTME: Reconcile command implementation.
// ABOUTME: Runs one pass, or keeps requeueing with --watch until the import settles.

use super::workspace::{Workspace, client_factory};
use cosimport::config::Config;
use cosimport::error::Result;
use cosimport::events::EventRecorder;
use cosimport::output::Output;
use cosimport::reconcile::{PassOutcome, run_pass};
use std::path::Path;
use std::sync::Arc;

pub async fn reconcile(
    config: &Config,
    cwd: &Path,
    name: &str,
    watch: bool,
    mut output: Output,
) -> Result<()> {
    let workspace = Workspace::open(config, cwd);
    let factory = client_factory(config)?;
    let recorder: Arc<dyn EventRecorder> = workspace.journal.clone();
    let options = config.reconcile_options();

    output.start_timer();

    loop {
        // Re-read every pass; the previous pass persisted its status.
        let image = workspace.image(name).await?;
        let result = run_pass(
            workspace.store.clone(),
            image,
            &factory,
            recorder.clone(),
            options,
        )
        .await;
        workspace.flush_events().await;
        let outcome = result?;

        report(&output, name, &outcome);

        if !(watch && outcome.needs_requeue()) {
            return Ok(());
        }

        output.progress(&format!(
            "Checking again in {}",
            humantime_serde::re::humantime::format_duration(config.reconcile.requeue_after)
        ));
        tokio::time::sleep(config.reconcile.requeue_after).await;
    }
}

fn report(output: &Output, name: &str, outcome: &PassOutcome) {
    match outcome {
        PassOutcome::Ready(id) => output.success(&format!("{name} is available as image {id}")),
        PassOutcome::Importing(job) => {
            output.success(&format!("{name} is importing (job {job})"))
        }
        PassOutcome::ImportFailed { job, message } => {
            output.warning(&format!("{name} import job {job} failed: {message}"))
        }
        PassOutcome::Finalized => {
            output.success(&format!("{name} released its remote objects"))
        }
    }
}
