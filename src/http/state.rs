use crate::session::CaptureSession;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single capture session this service drives
    pub session: CaptureSession,
}

impl AppState {
    pub fn new(session: CaptureSession) -> Self {
        Self { session }
    }
}
