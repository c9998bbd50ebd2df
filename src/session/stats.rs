use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::capture::TeardownReport;
use crate::device::RecorderState;

/// Snapshot of a capture session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Permission has been primed and the last acquisition did not fail
    pub ready: bool,

    /// A session holds (or is acquiring) the device stream
    pub active: bool,

    /// State of the most recent recorder, `idle` if none was started
    pub recorder_state: RecorderState,

    /// When the most recent session started
    pub started_at: Option<DateTime<Utc>>,

    /// Stills saved across all sessions
    pub photos_saved: usize,

    /// Clips saved across all sessions
    pub videos_saved: usize,

    /// Saves that failed and lost their artifact
    pub saves_failed: usize,

    /// Result of the most recent teardown
    pub last_teardown: Option<TeardownReport>,
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// Stream acquired and capture scheduled
    Started,
    /// Permission was never primed, or the last acquisition failed
    NotReady,
    /// Another session is running; the request was ignored
    AlreadyActive,
    /// The device could not be opened; state has been reset
    AcquisitionFailed,
    /// Torn down before capture was scheduled; nothing will be captured
    Interrupted,
}
