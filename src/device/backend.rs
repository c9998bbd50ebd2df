use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::preview::StreamPreview;
use super::synthetic::{SyntheticConfig, SyntheticDevices};
use crate::error::{CaptureError, CaptureResult};
use crate::session::config::{IDEAL_HEIGHT, IDEAL_WIDTH};

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// Video part of a device request. Width and height are hints; the device
/// may deliver anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

/// Device request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    /// `None` means no video track. `Some` with default hints is a plain
    /// "video: true" request.
    pub video: Option<VideoConstraints>,
    pub audio: bool,
}

impl MediaConstraints {
    /// Plain audio+video request used to resolve the permission prompt
    pub fn basic() -> Self {
        Self {
            video: Some(VideoConstraints {
                facing: FacingMode::User,
                ideal_width: IDEAL_WIDTH,
                ideal_height: IDEAL_HEIGHT,
            }),
            audio: true,
        }
    }

    /// Front-facing audio+video request for a capture session
    pub fn capture(ideal_width: u32, ideal_height: u32) -> Self {
        Self {
            video: Some(VideoConstraints {
                facing: FacingMode::User,
                ideal_width,
                ideal_height,
            }),
            audio: true,
        }
    }
}

/// Decoded video frame (RGB8, row-major, tightly packed)
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// Time since the stream went live
    pub timestamp: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// One hardware track of a device stream
pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;

    fn state(&self) -> TrackState;

    /// Release the hardware behind this track. Only the first call has an
    /// effect.
    fn stop(&self);
}

/// Live audio+video feed from local capture hardware.
///
/// Shared by reference between the preview sink and the capture operations.
pub trait DeviceStream: Send + Sync {
    fn id(&self) -> &str;

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    /// Latest decodable frame, in the dimensions the device actually delivers
    fn grab_frame(&self) -> Option<VideoFrame>;

    fn live_tracks(&self) -> usize {
        self.tracks()
            .iter()
            .filter(|t| t.state() == TrackState::Live)
            .count()
    }
}

/// Host entry point for device access
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// Whether the host exposes capture at all
    fn is_supported(&self) -> bool;

    /// Open a stream. This is where the host may show its permission prompt.
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> CaptureResult<Arc<dyn DeviceStream>>;
}

/// Media element readiness, ordered like the host's `readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Visual element the live stream is bound to
pub trait PreviewSink: Send + Sync {
    fn attach(&self, stream: Arc<dyn DeviceStream>);

    fn play(&self) -> CaptureResult<()>;

    fn detach(&self);

    fn ready_state(&self) -> ReadyState;

    /// Delivered dimensions, `(0, 0)` until a frame has been decoded
    fn video_dimensions(&self) -> (u32, u32);

    fn current_frame(&self) -> Option<VideoFrame>;

    fn is_attached(&self) -> bool;
}

/// Recorder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Idle,
    Recording,
    Stopped,
}

/// One buffered fragment delivered by a recorder
#[derive(Debug, Clone)]
pub struct DataChunk {
    pub data: Vec<u8>,
    /// Empty when the recorder did not tag the fragment
    pub mime: String,
    /// Recording time covered up to the end of this fragment
    pub timecode: Duration,
}

/// Incremental recorder bound to one stream
pub trait MediaRecorder: Send {
    /// Begin recording, flushing a fragment every `timeslice`.
    ///
    /// The receiver closes once `stop` has been called and every fragment
    /// has been delivered.
    fn start(&mut self, timeslice: Duration) -> CaptureResult<mpsc::UnboundedReceiver<DataChunk>>;

    /// No-op unless recording
    fn stop(&mut self);

    fn state(&self) -> RecorderState;

    fn mime_type(&self) -> &str;
}

/// Host recorder capability
pub trait RecorderFactory: Send + Sync {
    fn is_type_supported(&self, mime: &str) -> bool;

    /// `mime` of `None` lets the host pick its default format
    fn create(
        &self,
        stream: Arc<dyn DeviceStream>,
        mime: Option<&str>,
    ) -> CaptureResult<Box<dyn MediaRecorder>>;
}

/// Device source type
#[derive(Debug, Clone)]
pub enum DeviceSource {
    /// Native camera/microphone of this machine
    Platform,
    /// Software test-pattern device
    Synthetic(SyntheticConfig),
}

/// Host capabilities a capture session runs against
#[derive(Clone)]
pub struct DeviceBackend {
    pub devices: Arc<dyn MediaDevices>,
    /// `None` when the host has no recording capability at all
    pub recorders: Option<Arc<dyn RecorderFactory>>,
    pub preview: Arc<dyn PreviewSink>,
}

/// Device backend factory
pub struct DeviceBackendFactory;

impl DeviceBackendFactory {
    /// Create device backend based on platform and configuration
    pub fn create(source: DeviceSource) -> CaptureResult<DeviceBackend> {
        match source {
            DeviceSource::Platform => Err(CaptureError::CapabilityAbsent),

            DeviceSource::Synthetic(config) => {
                let recorder_available = config.recorder_available;
                let devices = Arc::new(SyntheticDevices::new(config));
                let recorders: Option<Arc<dyn RecorderFactory>> = if recorder_available {
                    Some(devices.clone() as Arc<dyn RecorderFactory>)
                } else {
                    None
                };

                Ok(DeviceBackend {
                    devices,
                    recorders,
                    preview: Arc::new(StreamPreview::new()),
                })
            }
        }
    }
}
