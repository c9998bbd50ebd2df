pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod http;
pub mod persist;
pub mod session;

pub use capture::{
    encode_photo, select_mime, ChunkBuffer, Container, LifecycleReaper, PermissionGate,
    PermissionState, PhotoBurstCapturer, SavedVideo, StatusIndicator, TeardownReport,
    TracingStatus, VideoArtifact, VideoRecorder, MIME_PREFERENCES,
};
pub use config::Config;
pub use device::{
    DeviceBackend, DeviceBackendFactory, DeviceSource, DeviceStream, MediaDevices, PreviewSink,
    RecorderFactory, StreamPreview, SyntheticConfig, SyntheticDevices,
};
pub use error::{CaptureError, CaptureResult};
pub use http::{create_router, AppState};
pub use persist::{Blob, DownloadsHost, PersistenceSink, SaveHost};
pub use session::{CaptureConfig, CaptureSchedule, CaptureSession, SessionStats, StartOutcome};
