// ABOUTME: File-backed event journal in JSON lines format.
// ABOUTME: Buffers events during a pass and appends them to <state_dir>/events.jsonl with tokio::fs.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{Event, EventRecorder, log_event};

pub const JOURNAL_FILENAME: &str = "events.jsonl";

/// Append-only journal shared by every pass run from the CLI.
///
/// `record` is called from inside a pass and never touches the disk; events
/// wait in memory until [`JournalRecorder::flush`].
#[derive(Debug)]
pub struct JournalRecorder {
    path: PathBuf,
    pending: Mutex<Vec<Event>>,
}

impl JournalRecorder {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(JOURNAL_FILENAME),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the events about `subject`, oldest first. Unparseable lines
    /// are skipped.
    pub async fn events_for(&self, subject: &str) -> std::io::Result<Vec<Event>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(contents
            .lines()
            .filter_map(|line| serde_json::from_str::<Event>(line).ok())
            .filter(|event| event.subject == subject)
            .collect())
    }

    /// Append buffered events to the journal file.
    ///
    /// The buffer is drained even when the write fails; the journal is a
    /// history aid, and a pass must not keep events around indefinitely.
    pub async fn flush(&self) -> std::io::Result<()> {
        let events = std::mem::take(&mut *self.pending.lock());
        if events.is_empty() {
            return Ok(());
        }

        let mut lines = String::new();
        for event in &events {
            lines.push_str(&serde_json::to_string(event)?);
            lines.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        // One write per flush so lines from concurrent processes stay whole.
        file.write_all(lines.as_bytes()).await?;
        file.flush().await
    }

    /// Number of events waiting for [`JournalRecorder::flush`].
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl EventRecorder for JournalRecorder {
    fn record(&self, event: Event) {
        log_event(&event);
        self.pending.lock().push(event);
    }
}
