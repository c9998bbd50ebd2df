use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::device::{DataChunk, DeviceStream, MediaRecorder, RecorderFactory, RecorderState};
use crate::persist::{Blob, PersistenceSink};
use crate::session::CaptureConfig;

/// Type used when the recorder did not tag its fragments
pub const DEFAULT_VIDEO_MIME: &str = "video/webm";

/// Video container of a finished clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    WebM,
    Mp4,
}

impl Container {
    pub fn from_mime(mime: &str) -> Self {
        if mime.contains("mp4") {
            Container::Mp4
        } else {
            Container::WebM
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Container::WebM => "webm",
            Container::Mp4 => "mp4",
        }
    }
}

/// Entry of the recorder format preference table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimeCandidate {
    pub mime: &'static str,
    pub container: Container,
}

/// Best quality first, plain baseline last
pub const MIME_PREFERENCES: &[MimeCandidate] = &[
    MimeCandidate {
        mime: "video/webm;codecs=vp9,opus",
        container: Container::WebM,
    },
    MimeCandidate {
        mime: "video/webm;codecs=vp8,opus",
        container: Container::WebM,
    },
    MimeCandidate {
        mime: "video/webm",
        container: Container::WebM,
    },
    MimeCandidate {
        mime: "video/mp4",
        container: Container::Mp4,
    },
];

/// First candidate the host supports, in table order
pub fn select_mime<F>(candidates: &[MimeCandidate], is_supported: F) -> Option<&MimeCandidate>
where
    F: Fn(&str) -> bool,
{
    candidates.iter().find(|c| is_supported(c.mime))
}

/// Filename of the recorded clip
pub fn video_filename(prefix: &str, container: Container) -> String {
    format!("{}_video.{}", prefix, container.extension())
}

/// Fragments in delivery order
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<DataChunk>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments are dropped; returns whether the
    /// fragment was kept.
    pub fn push(&mut self, chunk: DataChunk) -> bool {
        if chunk.data.is_empty() {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Concatenate every fragment into one clip. `None` if nothing was
    /// ever buffered.
    pub fn assemble(self) -> Option<VideoArtifact> {
        let first = self.chunks.first()?;
        let mime = if first.mime.is_empty() {
            DEFAULT_VIDEO_MIME.to_string()
        } else {
            first.mime.clone()
        };
        let duration = self.chunks.last().map(|c| c.timecode).unwrap_or_default();
        let chunk_count = self.chunks.len();

        let total: usize = self.chunks.iter().map(|c| c.data.len()).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in self.chunks {
            bytes.extend_from_slice(&chunk.data);
        }

        Some(VideoArtifact {
            container: Container::from_mime(&mime),
            mime,
            bytes,
            chunk_count,
            duration,
        })
    }
}

/// Assembled clip
#[derive(Debug, Clone)]
pub struct VideoArtifact {
    pub mime: String,
    pub container: Container,
    pub bytes: Vec<u8>,
    pub chunk_count: usize,
    /// Recording time covered by the last fragment
    pub duration: Duration,
}

/// What was handed to the persistence sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedVideo {
    pub filename: String,
    pub mime: String,
    pub container: Container,
    pub size_bytes: usize,
    pub chunk_count: usize,
    pub duration_ms: u64,
}

/// Records the shared stream into a single clip.
pub struct VideoRecorder {
    recorders: Option<Arc<dyn RecorderFactory>>,
    sink: Arc<PersistenceSink>,
    preferences: &'static [MimeCandidate],
    timeslice: Duration,
    prefix: String,
}

impl VideoRecorder {
    pub fn new(
        recorders: Option<Arc<dyn RecorderFactory>>,
        sink: Arc<PersistenceSink>,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            recorders,
            sink,
            preferences: MIME_PREFERENCES,
            timeslice: config.chunk_interval,
            prefix: config.file_prefix.clone(),
        }
    }

    /// Start recording `stream`.
    ///
    /// Returns `None` when no recorder can be created; photo capture is not
    /// affected by that.
    pub fn start(&self, stream: Arc<dyn DeviceStream>) -> Option<ActiveRecording> {
        let Some(factory) = &self.recorders else {
            warn!("Recorder unavailable on this host, skipping video");
            return None;
        };

        let candidate = select_mime(self.preferences, |m| factory.is_type_supported(m));
        match candidate {
            Some(c) => debug!("Selected recorder format {}", c.mime),
            None => debug!("No preferred format supported, using recorder default"),
        }

        let mut recorder = match factory.create(stream, candidate.map(|c| c.mime)) {
            Ok(recorder) => recorder,
            Err(e) => {
                warn!("Recorder unavailable: {}", e);
                return None;
            }
        };

        let chunk_rx = match recorder.start(self.timeslice) {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Failed to start recorder: {}", e);
                return None;
            }
        };

        let mime = recorder.mime_type().to_string();
        info!(
            "Recording started ({}, flushing every {:?})",
            mime, self.timeslice
        );

        let collector = tokio::spawn(collect_and_save(
            chunk_rx,
            Arc::clone(&self.sink),
            self.prefix.clone(),
        ));

        Some(ActiveRecording {
            recorder: Mutex::new(recorder),
            collector: tokio::sync::Mutex::new(Some(collector)),
            mime,
        })
    }

    /// Record for exactly `duration`, then save the clip.
    pub async fn record_for(
        &self,
        stream: Arc<dyn DeviceStream>,
        duration: Duration,
    ) -> Option<SavedVideo> {
        let recording = self.start(stream)?;
        recording.stop_after(duration).await
    }
}

/// Recorder that has been started
pub struct ActiveRecording {
    recorder: Mutex<Box<dyn MediaRecorder>>,
    collector: tokio::sync::Mutex<Option<JoinHandle<Option<SavedVideo>>>>,
    mime: String,
}

impl ActiveRecording {
    pub fn mime_type(&self) -> &str {
        &self.mime
    }

    pub fn state(&self) -> RecorderState {
        self.recorder
            .lock()
            .map(|r| r.state())
            .unwrap_or(RecorderState::Stopped)
    }

    /// Stop recording. Safe to call any number of times.
    pub fn stop(&self) {
        let mut recorder = self.recorder.lock().unwrap_or_else(|e| e.into_inner());
        if recorder.state() == RecorderState::Recording {
            info!("Stopping recorder");
            recorder.stop();
        }
    }

    /// Wait for the clip to be assembled and saved. Only the first caller
    /// gets the result.
    pub async fn finished(&self) -> Option<SavedVideo> {
        let handle = self.collector.lock().await.take()?;
        match handle.await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Video assembly task failed: {}", e);
                None
            }
        }
    }

    /// Stop once `duration` has elapsed, then wait for the clip.
    pub async fn stop_after(&self, duration: Duration) -> Option<SavedVideo> {
        tokio::time::sleep(duration).await;
        self.stop();
        self.finished().await
    }
}

/// Buffer fragments until the recorder closes its channel, then assemble
/// and save the clip.
async fn collect_and_save(
    mut chunk_rx: mpsc::UnboundedReceiver<DataChunk>,
    sink: Arc<PersistenceSink>,
    prefix: String,
) -> Option<SavedVideo> {
    let mut buffer = ChunkBuffer::new();
    while let Some(chunk) = chunk_rx.recv().await {
        let size = chunk.data.len();
        if buffer.push(chunk) {
            debug!("Buffered fragment {} ({} bytes)", buffer.len(), size);
        }
    }

    let Some(artifact) = buffer.assemble() else {
        info!("Recorder stopped without data, nothing to save");
        return None;
    };

    let filename = video_filename(&prefix, artifact.container);
    let saved = SavedVideo {
        filename: filename.clone(),
        mime: artifact.mime.clone(),
        container: artifact.container,
        size_bytes: artifact.bytes.len(),
        chunk_count: artifact.chunk_count,
        duration_ms: artifact.duration.as_millis() as u64,
    };

    info!(
        "Clip assembled: {} fragments, {} bytes, {}ms",
        saved.chunk_count, saved.size_bytes, saved.duration_ms
    );

    if sink.save(Blob::new(artifact.bytes, artifact.mime), &filename) {
        Some(saved)
    } else {
        None
    }
}
