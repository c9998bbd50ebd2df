use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::device::{MediaConstraints, MediaDevices};
use crate::error::CaptureError;

/// Outcome of permission priming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Ready,
    Unavailable,
}

impl PermissionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, PermissionState::Ready)
    }

    /// Status text shown next to the trigger
    pub fn label(&self) -> &'static str {
        match self {
            PermissionState::Ready => "📷 camera ready",
            PermissionState::Unavailable => "(camera unavailable)",
        }
    }

    /// Status text colour
    pub fn css_color(&self) -> &'static str {
        match self {
            PermissionState::Ready => "rgba(180,255,200,0.65)",
            PermissionState::Unavailable => "rgba(255,180,180,0.45)",
        }
    }
}

/// Optional indicator updated after each priming attempt
pub trait StatusIndicator: Send + Sync {
    fn show(&self, state: PermissionState);
}

/// Indicator that only logs
pub struct TracingStatus;

impl StatusIndicator for TracingStatus {
    fn show(&self, state: PermissionState) {
        info!("Status: {} [{}]", state.label(), state.css_color());
    }
}

/// Resolves the permission prompt ahead of the real capture.
///
/// Must run inside the user's gesture: hosts reject device requests that
/// are not user-initiated. The device is released immediately.
pub struct PermissionGate {
    devices: Arc<dyn MediaDevices>,
    status: Option<Arc<dyn StatusIndicator>>,
}

impl PermissionGate {
    pub fn new(devices: Arc<dyn MediaDevices>, status: Option<Arc<dyn StatusIndicator>>) -> Self {
        Self { devices, status }
    }

    pub async fn prime(&self) -> PermissionState {
        let state = match self.request().await {
            Ok(()) => PermissionState::Ready,
            Err(e) => {
                warn!("Camera permission not available: {}", e);
                PermissionState::Unavailable
            }
        };

        if let Some(status) = &self.status {
            status.show(state);
        }

        state
    }

    async fn request(&self) -> Result<(), CaptureError> {
        if !self.devices.is_supported() {
            return Err(CaptureError::CapabilityAbsent);
        }

        let stream = self
            .devices
            .get_user_media(&MediaConstraints::basic())
            .await?;

        for track in stream.tracks() {
            track.stop();
        }

        info!("Camera permission primed (stream {} released)", stream.id());

        Ok(())
    }
}
