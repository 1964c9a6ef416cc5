// ABOUTME: Human-facing notifications about import outcomes.
// ABOUTME: Best-effort recorders that never influence reconcile control flow.

mod journal;
mod memory;

pub use journal::JournalRecorder;
pub use memory::MemoryRecorder;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an event reports progress or a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Normal,
    Warning,
}

/// Machine-readable cause attached to each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reason {
    SuccessfulRetrieveImage,
    FailedRetrieveImage,
    FailedGetImageImportJob,
    SuccessfulCreateImageImportJob,
    FailedCreateImageImportJob,
    ImageImportFailed,
    SuccessfulDeleteImage,
    FailedDeleteImage,
    SuccessfulDeleteImageImportJob,
    FailedDeleteImageImportJob,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::SuccessfulRetrieveImage => "SuccessfulRetrieveImage",
            Reason::FailedRetrieveImage => "FailedRetrieveImage",
            Reason::FailedGetImageImportJob => "FailedGetImageImportJob",
            Reason::SuccessfulCreateImageImportJob => "SuccessfulCreateImageImportJob",
            Reason::FailedCreateImageImportJob => "FailedCreateImageImportJob",
            Reason::ImageImportFailed => "ImageImportFailed",
            Reason::SuccessfulDeleteImage => "SuccessfulDeleteImage",
            Reason::FailedDeleteImage => "FailedDeleteImage",
            Reason::SuccessfulDeleteImageImportJob => "SuccessfulDeleteImageImportJob",
            Reason::FailedDeleteImageImportJob => "FailedDeleteImageImportJob",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Name of the managed image the event is about.
    pub subject: String,
    pub reason: Reason,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Host that produced the event.
    pub source: String,
}

impl Event {
    pub fn new(kind: EventKind, subject: &str, reason: Reason, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.to_string(),
            reason,
            message: message.into(),
            timestamp: Utc::now(),
            source: gethostname::gethostname().to_string_lossy().into_owned(),
        }
    }
}

/// Append-only sink for events.
///
/// Recording must not fail from the caller's point of view: implementations
/// swallow their own errors.
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: Event);

    fn success(&self, subject: &str, reason: Reason, message: &str) {
        self.record(Event::new(EventKind::Normal, subject, reason, message));
    }

    fn warn(&self, subject: &str, reason: Reason, message: &str) {
        self.record(Event::new(EventKind::Warning, subject, reason, message));
    }
}

/// Recorder that only emits log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn record(&self, event: Event) {
        log_event(&event);
    }
}

pub(crate) fn log_event(event: &Event) {
    match event.kind {
        EventKind::Normal => {
            tracing::info!("{} {}: {}", event.subject, event.reason, event.message)
        }
        EventKind::Warning => {
            tracing::warn!("{} {}: {}", event.subject, event.reason, event.message)
        }
    }
}
