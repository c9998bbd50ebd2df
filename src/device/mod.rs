pub mod backend;
pub mod preview;
pub mod synthetic;

pub use backend::{
    DataChunk, DeviceBackend, DeviceBackendFactory, DeviceSource, DeviceStream, FacingMode,
    MediaConstraints, MediaDevices, MediaRecorder, MediaTrack, PreviewSink, ReadyState,
    RecorderFactory, RecorderState, TrackKind, TrackState, VideoConstraints, VideoFrame,
};
pub use preview::StreamPreview;
pub use synthetic::{SyntheticConfig, SyntheticDevices, SyntheticStream, SyntheticTrack};
