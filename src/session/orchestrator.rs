use std::time::Duration;

use tracing::debug;

use super::config::CaptureConfig;
use crate::device::{PreviewSink, ReadyState};

/// Offsets of every capture step, measured from the moment real frames are
/// flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSchedule {
    pub first_photo: Duration,
    pub last_photo: Duration,
    pub video_start: Duration,
    pub video_stop: Duration,
    pub teardown: Duration,
}

impl CaptureSchedule {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            first_photo: config.photo_delay,
            last_photo: config.photo_burst_end(),
            video_start: config.video_delay,
            video_stop: config.video_delay + config.video_duration,
            teardown: config.teardown_delay(),
        }
    }
}

/// Poll the preview once per display refresh until it has a decodable frame
/// with real dimensions, giving up after `ceiling`.
///
/// Returns whether frames were seen. Capture proceeds either way.
pub async fn wait_for_frames(preview: &dyn PreviewSink, poll: Duration, ceiling: Duration) -> bool {
    let frames = async {
        let mut ticker = tokio::time::interval(poll);
        loop {
            ticker.tick().await;
            if preview.ready_state() >= ReadyState::HaveCurrentData
                && preview.video_dimensions().0 > 0
            {
                return;
            }
        }
    };

    match tokio::time::timeout(ceiling, frames).await {
        Ok(()) => true,
        Err(_) => {
            debug!("No frames after {:?}, capturing anyway", ceiling);
            false
        }
    }
}
