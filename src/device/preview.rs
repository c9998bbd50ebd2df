use std::sync::{Arc, Mutex};

use tracing::debug;

use super::backend::{DeviceStream, PreviewSink, ReadyState, VideoFrame};
use crate::error::CaptureResult;

#[derive(Default)]
struct PreviewState {
    stream: Option<Arc<dyn DeviceStream>>,
    playing: bool,
    /// Dimensions of the last decoded frame
    dimensions: (u32, u32),
}

/// Preview element that shows whatever stream is attached to it.
///
/// Works over any [`DeviceStream`]: readiness and dimensions are derived
/// from the frames the stream actually produces.
#[derive(Default)]
pub struct StreamPreview {
    state: Mutex<PreviewState>,
}

impl StreamPreview {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(&self) -> Option<VideoFrame> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.playing {
            return None;
        }
        let frame = state.stream.as_ref()?.grab_frame()?;
        state.dimensions = (frame.width, frame.height);
        Some(frame)
    }
}

impl PreviewSink for StreamPreview {
    fn attach(&self, stream: Arc<dyn DeviceStream>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!("Preview attached to stream {}", stream.id());
        state.stream = Some(stream);
        state.playing = false;
        state.dimensions = (0, 0);
    }

    fn play(&self) -> CaptureResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.stream.is_some() {
            state.playing = true;
        }
        Ok(())
    }

    fn detach(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(stream) = state.stream.take() {
            debug!("Preview detached from stream {}", stream.id());
        }
        state.playing = false;
        state.dimensions = (0, 0);
    }

    fn ready_state(&self) -> ReadyState {
        let attached = self
            .state
            .lock()
            .map(|s| s.stream.is_some())
            .unwrap_or(false);
        if !attached {
            return ReadyState::HaveNothing;
        }
        match self.decode() {
            Some(_) => ReadyState::HaveEnoughData,
            None => ReadyState::HaveMetadata,
        }
    }

    fn video_dimensions(&self) -> (u32, u32) {
        self.state
            .lock()
            .map(|s| s.dimensions)
            .unwrap_or((0, 0))
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        self.decode()
    }

    fn is_attached(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.stream.is_some())
            .unwrap_or(false)
    }
}
