use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::video::ActiveRecording;
use crate::device::{DeviceStream, PreviewSink, RecorderState, TrackState};

/// What a teardown actually released
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    /// The recorder was still running and has been told to stop
    pub recorder_stopped: bool,
    /// Tracks that were live and have been stopped
    pub tracks_stopped: usize,
    /// A stream reference was held and has been dropped
    pub stream_released: bool,
}

/// Releases the capture resources of a session.
pub struct LifecycleReaper {
    preview: Arc<dyn PreviewSink>,
}

impl LifecycleReaper {
    pub fn new(preview: Arc<dyn PreviewSink>) -> Self {
        Self { preview }
    }

    /// Stop the recorder if it is still running, stop every live track and
    /// detach the preview. Either input may be absent, e.g. after a failed
    /// acquisition.
    pub fn reap(
        &self,
        recording: Option<&ActiveRecording>,
        stream: Option<Arc<dyn DeviceStream>>,
    ) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(recording) = recording {
            if recording.state() == RecorderState::Recording {
                // Assembly continues on the recorder's own task
                recording.stop();
                report.recorder_stopped = true;
            }
        }

        if let Some(stream) = stream {
            report.tracks_stopped = self.release(stream.as_ref());
            report.stream_released = true;
        }

        if self.preview.is_attached() {
            self.preview.detach();
        }

        report
    }

    /// Stop every live track of `stream` without touching the preview.
    /// Returns the number of tracks stopped.
    pub fn release(&self, stream: &dyn DeviceStream) -> usize {
        let mut stopped = 0;
        for track in stream.tracks() {
            if track.state() == TrackState::Live {
                track.stop();
                stopped += 1;
                debug!("Stopped {:?} track", track.kind());
            }
        }
        info!("Released stream {} ({} tracks stopped)", stream.id(), stopped);
        stopped
    }
}
