//! Capture operations run against one shared device stream
//!
//! - `permission`: resolves the permission prompt ahead of time
//! - `photo`: mirrored JPEG stills at a fixed cadence
//! - `video`: chunked recording with format fallback
//! - `reaper`: releases the recorder, tracks and preview

pub mod permission;
pub mod photo;
pub mod reaper;
pub mod video;

pub use permission::{PermissionGate, PermissionState, StatusIndicator, TracingStatus};
pub use photo::{encode_photo, photo_filename, PhotoArtifact, PhotoBurstCapturer};
pub use reaper::{LifecycleReaper, TeardownReport};
pub use video::{
    select_mime, video_filename, ActiveRecording, ChunkBuffer, Container, MimeCandidate,
    SavedVideo, VideoArtifact, VideoRecorder, MIME_PREFERENCES,
};
