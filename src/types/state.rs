// ABOUTME: Lifecycle states for managed images and remote import jobs.
// ABOUTME: Maps the provider's free-form job state strings onto a closed set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed state of a managed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageState {
    #[default]
    Unknown,
    Importing,
    Available,
    Failed,
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImageState::Unknown => "unknown",
            ImageState::Importing => "importing",
            ImageState::Available => "available",
            ImageState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// State of a remote import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobState {
    /// Map a state string reported by the provider.
    ///
    /// The provider has more intermediate states than we care about
    /// (`readyForProcessing`, `inProgress`, ...). Anything that is not
    /// explicitly queued or terminal is treated as running, so an unfamiliar
    /// state can never unlock a second import.
    pub fn from_remote(state: &str) -> Self {
        match state {
            "queued" => JobState::Queued,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            _ => JobState::InProgress,
        }
    }

    /// Whether the job has stopped running, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::InProgress => "in-progress",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}
