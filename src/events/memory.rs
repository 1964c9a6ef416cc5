// ABOUTME: In-memory event recorder.
// ABOUTME: Collects events for inspection by tests and embedding callers.

use parking_lot::Mutex;

use super::{Event, EventKind, EventRecorder, Reason, log_event};

/// Keeps every recorded event, in order, and logs it via tracing.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<Event>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn reasons(&self) -> Vec<Reason> {
        self.events.lock().iter().map(|e| e.reason).collect()
    }

    pub fn warnings(&self) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == EventKind::Warning)
            .cloned()
            .collect()
    }

    pub fn has_warnings(&self) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.kind == EventKind::Warning)
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, event: Event) {
        log_event(&event);
        self.events.lock().push(event);
    }
}
