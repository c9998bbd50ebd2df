// Software capture device
//
// Produces a moving test pattern on its video track and a fake container
// byte stream from its recorder, so the whole capture pipeline can run on
// machines without a camera (CI, headless servers, the `run` command).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info};

use super::backend::{
    DataChunk, DeviceStream, FacingMode, MediaConstraints, MediaDevices, MediaRecorder, MediaTrack,
    RecorderFactory, RecorderState, TrackKind, TrackState, VideoFrame,
};
use crate::error::{CaptureError, CaptureResult};

const WEBM_MAGIC: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3];
const MP4_MAGIC: &[u8] = b"\0\0\0\x18ftypmp42";

/// Behaviour of the synthetic device
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Whether the host exposes capture at all
    pub capability: bool,
    /// Whether the user grants the permission prompt
    pub grant_permission: bool,
    /// Fail every acquisition after the first (priming) one, as a camera
    /// grabbed by another application would
    pub busy_after_prime: bool,
    /// Resolution actually delivered, regardless of what was asked for
    pub width: u32,
    pub height: u32,
    /// Time from stream open until the first decodable frame
    pub warmup: Duration,
    /// Whether a recorder capability exists
    pub recorder_available: bool,
    /// Container/codec strings the recorder accepts
    pub supported_mimes: Vec<String>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            capability: true,
            grant_permission: true,
            busy_after_prime: false,
            width: 640,
            height: 480,
            warmup: Duration::from_millis(100),
            recorder_available: true,
            supported_mimes: vec![
                "video/webm;codecs=vp8,opus".to_string(),
                "video/webm".to_string(),
            ],
        }
    }
}

/// Synthetic track that counts hardware releases
pub struct SyntheticTrack {
    kind: TrackKind,
    ended: AtomicBool,
    releases: AtomicUsize,
}

impl SyntheticTrack {
    fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            ended: AtomicBool::new(false),
            releases: AtomicUsize::new(0),
        }
    }

    /// Number of times the hardware behind this track was actually released
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl MediaTrack for SyntheticTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn state(&self) -> TrackState {
        if self.ended.load(Ordering::SeqCst) {
            TrackState::Ended
        } else {
            TrackState::Live
        }
    }

    fn stop(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Stream of synthetic tracks
pub struct SyntheticStream {
    id: String,
    tracks: Vec<Arc<SyntheticTrack>>,
    width: u32,
    height: u32,
    opened_at: Instant,
    warmup: Duration,
}

impl SyntheticStream {
    pub fn synthetic_tracks(&self) -> &[Arc<SyntheticTrack>] {
        &self.tracks
    }

    fn video_live(&self) -> bool {
        self.tracks
            .iter()
            .any(|t| t.kind == TrackKind::Video && t.state() == TrackState::Live)
    }
}

impl DeviceStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn MediaTrack>)
            .collect()
    }

    fn grab_frame(&self) -> Option<VideoFrame> {
        if !self.video_live() {
            return None;
        }
        let elapsed = self.opened_at.elapsed();
        if elapsed < self.warmup {
            return None;
        }
        Some(test_pattern(self.width, self.height, elapsed))
    }
}

/// Horizontal red ramp, vertical green ramp and a white bar that sweeps
/// across the frame over time.
fn test_pattern(width: u32, height: u32, timestamp: Duration) -> VideoFrame {
    let bar_x = (timestamp.as_millis() as u32 / 10) % width.max(1);
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            if x.abs_diff(bar_x) < 4 {
                pixels.extend_from_slice(&[255, 255, 255]);
            } else {
                let r = (x * 255 / width.max(1)) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                pixels.extend_from_slice(&[r, g, 96]);
            }
        }
    }
    VideoFrame {
        width,
        height,
        pixels,
        timestamp,
    }
}

/// Synthetic media devices and recorder capability
pub struct SyntheticDevices {
    config: SyntheticConfig,
    requests: AtomicUsize,
    streams: Mutex<Vec<Arc<SyntheticStream>>>,
}

impl SyntheticDevices {
    pub fn new(config: SyntheticConfig) -> Self {
        info!(
            "Synthetic device initialized ({}x{}, warmup {:?}, recorder: {})",
            config.width, config.height, config.warmup, config.recorder_available
        );
        Self {
            config,
            requests: AtomicUsize::new(0),
            streams: Mutex::new(Vec::new()),
        }
    }

    /// Every stream handed out so far, in order
    pub fn streams(&self) -> Vec<Arc<SyntheticStream>> {
        self.streams
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Tracks across all streams that still hold hardware
    pub fn live_tracks(&self) -> usize {
        self.streams().iter().map(|s| s.live_tracks()).sum()
    }

    /// Number of get_user_media calls, successful or not
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MediaDevices for SyntheticDevices {
    fn is_supported(&self) -> bool {
        self.config.capability
    }

    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> CaptureResult<Arc<dyn DeviceStream>> {
        let attempt = self.requests.fetch_add(1, Ordering::SeqCst);

        if !self.config.capability {
            return Err(CaptureError::CapabilityAbsent);
        }
        if !self.config.grant_permission {
            return Err(CaptureError::PermissionDenied(
                "user dismissed the prompt".to_string(),
            ));
        }
        if let Some(video) = &constraints.video {
            if video.facing == FacingMode::Environment {
                return Err(CaptureError::AcquisitionFailure("no rear camera".to_string()));
            }
        }
        if self.config.busy_after_prime && attempt > 0 {
            return Err(CaptureError::AcquisitionFailure(
                "device is in use by another application".to_string(),
            ));
        }

        let mut tracks = Vec::new();
        if constraints.video.is_some() {
            tracks.push(Arc::new(SyntheticTrack::new(TrackKind::Video)));
        }
        if constraints.audio {
            tracks.push(Arc::new(SyntheticTrack::new(TrackKind::Audio)));
        }

        let stream = Arc::new(SyntheticStream {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
            width: self.config.width,
            height: self.config.height,
            opened_at: Instant::now(),
            warmup: self.config.warmup,
        });

        debug!(
            "Synthetic stream {} opened with {} tracks",
            stream.id,
            stream.tracks.len()
        );

        if let Ok(mut streams) = self.streams.lock() {
            streams.push(Arc::clone(&stream));
        }

        Ok(stream as Arc<dyn DeviceStream>)
    }
}

impl RecorderFactory for SyntheticDevices {
    fn is_type_supported(&self, mime: &str) -> bool {
        self.config.supported_mimes.iter().any(|m| m == mime)
    }

    fn create(
        &self,
        _stream: Arc<dyn DeviceStream>,
        mime: Option<&str>,
    ) -> CaptureResult<Box<dyn MediaRecorder>> {
        if !self.config.recorder_available {
            return Err(CaptureError::RecorderUnavailable(
                "no recorder on this device".to_string(),
            ));
        }
        let mime = match mime {
            Some(m) if !self.is_type_supported(m) => {
                return Err(CaptureError::RecorderUnavailable(format!(
                    "unsupported type {}",
                    m
                )))
            }
            Some(m) => m.to_string(),
            None => self
                .config
                .supported_mimes
                .first()
                .cloned()
                .unwrap_or_else(|| "video/webm".to_string()),
        };

        Ok(Box::new(SyntheticRecorder {
            mime,
            state: RecorderState::Idle,
            stop_tx: None,
        }))
    }
}

/// Recorder emitting fake container fragments on a fixed timeslice
pub struct SyntheticRecorder {
    mime: String,
    state: RecorderState,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl MediaRecorder for SyntheticRecorder {
    fn start(&mut self, timeslice: Duration) -> CaptureResult<mpsc::UnboundedReceiver<DataChunk>> {
        if self.state != RecorderState::Idle {
            return Err(CaptureError::RecorderUnavailable(
                "recorder already started".to_string(),
            ));
        }

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        tokio::spawn(emit_fragments(
            chunk_tx,
            stop_rx,
            timeslice,
            self.mime.clone(),
        ));

        self.stop_tx = Some(stop_tx);
        self.state = RecorderState::Recording;

        Ok(chunk_rx)
    }

    fn stop(&mut self) {
        if self.state != RecorderState::Recording {
            return;
        }
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        self.state = RecorderState::Stopped;
    }

    fn state(&self) -> RecorderState {
        self.state
    }

    fn mime_type(&self) -> &str {
        &self.mime
    }
}

async fn emit_fragments(
    chunk_tx: mpsc::UnboundedSender<DataChunk>,
    mut stop_rx: oneshot::Receiver<()>,
    timeslice: Duration,
    mime: String,
) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started + timeslice, timeslice);
    let mut seq: u32 = 0;
    let mut flushed = Duration::ZERO;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = started.elapsed();
                let data = fragment(&mime, seq, flushed, now);
                if chunk_tx.send(DataChunk { data, mime: mime.clone(), timecode: now }).is_err() {
                    break;
                }
                flushed = now;
                seq += 1;
            }
            _ = &mut stop_rx => {
                let now = started.elapsed();
                // Nothing left to flush if stop landed on a tick boundary
                let data = if now > flushed {
                    fragment(&mime, seq, flushed, now)
                } else {
                    Vec::new()
                };
                let _ = chunk_tx.send(DataChunk { data, mime: mime.clone(), timecode: now });
                break;
            }
        }
    }

    debug!("Synthetic recorder flushed {} fragments", seq + 1);
}

fn fragment(mime: &str, seq: u32, from: Duration, to: Duration) -> Vec<u8> {
    let mut data = Vec::new();
    if seq == 0 {
        if mime.contains("mp4") {
            data.extend_from_slice(MP4_MAGIC);
        } else {
            data.extend_from_slice(WEBM_MAGIC);
        }
    }
    data.extend_from_slice(&seq.to_le_bytes());
    data.extend_from_slice(&(to.as_millis() as u64).to_le_bytes());
    let payload = ((to - from).as_millis() as usize / 4).max(1);
    data.resize(data.len() + payload, 0xAB);
    data
}
