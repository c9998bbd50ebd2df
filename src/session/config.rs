use std::time::Duration;

use crate::error::{CaptureError, CaptureResult};

/// Number of stills in a burst
pub const PHOTOS: usize = 6;
/// Gap between consecutive stills
pub const PHOTO_GAP_MS: u64 = 500;
/// Length of the recorded clip
pub const VIDEO_MS: u64 = 10_000;
/// Delay between the first real frame and the first still
pub const PHOTO_DELAY_MS: u64 = 100;
/// Delay between the first real frame and recorder start
pub const VIDEO_DELAY_MS: u64 = 200;
/// Slack after the nominal end of the clip before the stream is released
pub const TERMINATION_MARGIN_MS: u64 = 2_000;
/// Upper bound on the wait for a decodable frame
pub const FRAME_WAIT_CEILING_MS: u64 = 800;
/// One display refresh at 60Hz
pub const FRAME_POLL_MS: u64 = 16;
/// Recorder flush interval
pub const CHUNK_INTERVAL_MS: u64 = 250;
/// How long an object URL stays alive after its download was triggered
pub const REVOKE_GRACE_MS: u64 = 2_000;
pub const JPEG_QUALITY: u8 = 92;
pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 720;
pub const FILE_PREFIX: &str = "reaction";

/// Timing and count constants for one capture session.
///
/// Values come from the constants above; the struct exists so the whole
/// schedule can be derived and validated in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub photo_count: usize,
    pub photo_gap: Duration,
    pub photo_delay: Duration,
    pub video_delay: Duration,
    pub video_duration: Duration,
    pub termination_margin: Duration,
    pub frame_wait_ceiling: Duration,
    pub frame_poll_interval: Duration,
    pub chunk_interval: Duration,
    pub revoke_grace: Duration,
    pub jpeg_quality: u8,
    /// Requested resolution, also the fallback raster size when the
    /// preview reports no dimensions
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub file_prefix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            photo_count: PHOTOS,
            photo_gap: Duration::from_millis(PHOTO_GAP_MS),
            photo_delay: Duration::from_millis(PHOTO_DELAY_MS),
            video_delay: Duration::from_millis(VIDEO_DELAY_MS),
            video_duration: Duration::from_millis(VIDEO_MS),
            termination_margin: Duration::from_millis(TERMINATION_MARGIN_MS),
            frame_wait_ceiling: Duration::from_millis(FRAME_WAIT_CEILING_MS),
            frame_poll_interval: Duration::from_millis(FRAME_POLL_MS),
            chunk_interval: Duration::from_millis(CHUNK_INTERVAL_MS),
            revoke_grace: Duration::from_millis(REVOKE_GRACE_MS),
            jpeg_quality: JPEG_QUALITY,
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
            file_prefix: FILE_PREFIX.to_string(),
        }
    }
}

impl CaptureConfig {
    /// Time from the first still to the last one
    pub fn photo_burst_span(&self) -> Duration {
        self.photo_gap
            .saturating_mul(self.photo_count.saturating_sub(1) as u32)
    }

    /// Offset (from the frame wait resolving) at which the last still is taken
    pub fn photo_burst_end(&self) -> Duration {
        self.photo_delay + self.photo_burst_span()
    }

    /// Offset (from the frame wait resolving) at which the stream is released
    pub fn teardown_delay(&self) -> Duration {
        self.video_delay + self.video_duration + self.termination_margin
    }

    /// Reject schedules where teardown could cut the photo burst short.
    pub fn validate(&self) -> CaptureResult<()> {
        if self.photo_count == 0 {
            return Err(CaptureError::InvalidConfig(
                "photo count must be at least 1".to_string(),
            ));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(CaptureError::InvalidConfig(format!(
                "jpeg quality {} outside 1..=100",
                self.jpeg_quality
            )));
        }
        if self.ideal_width == 0 || self.ideal_height == 0 {
            return Err(CaptureError::InvalidConfig(
                "fallback dimensions must be non-zero".to_string(),
            ));
        }
        if self.chunk_interval.is_zero() || self.frame_poll_interval.is_zero() {
            return Err(CaptureError::InvalidConfig(
                "chunk and frame poll intervals must be non-zero".to_string(),
            ));
        }
        if self.photo_burst_end() >= self.teardown_delay() {
            return Err(CaptureError::InvalidConfig(format!(
                "photo burst ends at {:?} but teardown fires at {:?}",
                self.photo_burst_end(),
                self.teardown_delay()
            )));
        }
        Ok(())
    }
}
