use thiserror::Error;

/// Failures that can occur anywhere in the capture pipeline.
///
/// Apart from `InvalidConfig` at construction, none of these reach the
/// caller of a session operation. Each is absorbed where it happens and
/// turns into a flag reset or a skipped artifact.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No capture hardware or API on this host
    #[error("capture capability is not available on this host")]
    CapabilityAbsent,

    /// User or platform refused access
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Device busy or hardware error while opening the session stream
    #[error("failed to acquire device stream: {0}")]
    AcquisitionFailure(String),

    /// No usable recording capability
    #[error("recorder unavailable: {0}")]
    RecorderUnavailable(String),

    /// The save pathway could not be constructed or invoked
    #[error("failed to persist artifact: {0}")]
    PersistenceFailure(String),

    #[error("invalid capture configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to encode still frame: {0}")]
    Encode(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;
