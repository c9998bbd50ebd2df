use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::CaptureConfig;
use super::orchestrator::{wait_for_frames, CaptureSchedule};
use super::stats::{SessionStats, StartOutcome};
use crate::capture::{
    ActiveRecording, LifecycleReaper, PermissionGate, PermissionState, PhotoBurstCapturer,
    StatusIndicator, TeardownReport, VideoRecorder,
};
use crate::device::{
    DeviceBackend, DeviceStream, MediaConstraints, MediaDevices, PreviewSink, RecorderState,
};
use crate::error::CaptureResult;
use crate::persist::{PersistenceSink, SaveHost};

/// Mutable state of the current (or last) session
#[derive(Default)]
struct SessionState {
    ready: bool,
    active: bool,
    /// Bumped on every start so stale timers can tell they are stale
    generation: u64,
    stream: Option<Arc<dyn DeviceStream>>,
    recording: Option<Arc<ActiveRecording>>,
    photo_task: Option<JoinHandle<()>>,
    video_task: Option<JoinHandle<()>>,
    reaper_task: Option<JoinHandle<()>>,
    started_at: Option<DateTime<Utc>>,
    last_teardown: Option<TeardownReport>,
}

impl SessionState {
    /// Whether `generation` is still the running session
    fn is_current(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }
}

struct SessionInner {
    config: CaptureConfig,
    schedule: CaptureSchedule,
    devices: Arc<dyn MediaDevices>,
    preview: Arc<dyn PreviewSink>,
    gate: PermissionGate,
    photos: PhotoBurstCapturer,
    video: VideoRecorder,
    reaper: LifecycleReaper,
    sink: Arc<PersistenceSink>,
    state: Mutex<SessionState>,
    photos_saved: AtomicUsize,
    videos_saved: AtomicUsize,
}

/// Capture session bound to one device backend.
///
/// At most one session is active at a time. The device stream is owned
/// here, shared by reference with the preview and both capture operations,
/// and released only by the reaper.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<SessionInner>,
}

impl CaptureSession {
    /// Create a capture session
    pub fn new(
        config: CaptureConfig,
        backend: DeviceBackend,
        save_host: Arc<dyn SaveHost>,
        status: Option<Arc<dyn StatusIndicator>>,
    ) -> CaptureResult<Self> {
        config.validate()?;

        let schedule = CaptureSchedule::from_config(&config);
        let sink = Arc::new(PersistenceSink::new(save_host, config.revoke_grace));

        info!(
            "Capture session created: {} stills every {:?}, {:?} clip, teardown at +{:?}",
            config.photo_count, config.photo_gap, config.video_duration, schedule.teardown
        );

        let inner = SessionInner {
            gate: PermissionGate::new(Arc::clone(&backend.devices), status),
            photos: PhotoBurstCapturer::new(
                Arc::clone(&backend.preview),
                Arc::clone(&sink),
                &config,
            ),
            video: VideoRecorder::new(backend.recorders.clone(), Arc::clone(&sink), &config),
            reaper: LifecycleReaper::new(Arc::clone(&backend.preview)),
            devices: backend.devices,
            preview: backend.preview,
            sink,
            schedule,
            config,
            state: Mutex::new(SessionState::default()),
            photos_saved: AtomicUsize::new(0),
            videos_saved: AtomicUsize::new(0),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.inner.config
    }

    pub fn schedule(&self) -> CaptureSchedule {
        self.inner.schedule
    }

    /// Resolve the permission prompt. Call from the user's gesture.
    pub async fn prime_permission(&self) -> PermissionState {
        let permission = self.inner.gate.prime().await;

        let mut state = self.inner.state.lock().await;
        state.ready = permission.is_ready();

        permission
    }

    /// Open the device stream and schedule stills, recording and teardown.
    ///
    /// Returns once real frames are flowing (or the frame wait gave up);
    /// capture itself runs on timers afterwards.
    pub async fn start(&self) -> StartOutcome {
        let generation = {
            let mut state = self.inner.state.lock().await;
            if !state.ready {
                info!("Camera not ready, ignoring start request");
                return StartOutcome::NotReady;
            }
            if state.active {
                warn!("Capture session already active, ignoring start request");
                return StartOutcome::AlreadyActive;
            }
            state.active = true;
            state.generation += 1;
            state.started_at = Some(Utc::now());
            state.recording = None;
            state.last_teardown = None;
            state.generation
        };

        info!("Starting capture session #{}", generation);

        let config = &self.inner.config;
        let constraints = MediaConstraints::capture(config.ideal_width, config.ideal_height);

        let stream = match self.inner.devices.get_user_media(&constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to open camera stream: {}", e);
                let mut state = self.inner.state.lock().await;
                state.ready = false;
                state.active = false;
                return StartOutcome::AcquisitionFailed;
            }
        };

        {
            let mut state = self.inner.state.lock().await;
            if !state.is_current(generation) {
                info!("Session #{} torn down while opening the stream", generation);
                self.inner.reaper.release(stream.as_ref());
                return StartOutcome::Interrupted;
            }
            state.stream = Some(Arc::clone(&stream));
        }

        self.inner.preview.attach(Arc::clone(&stream));
        if let Err(e) = self.inner.preview.play() {
            debug!("Preview refused to play: {}", e);
        }

        let has_frames = wait_for_frames(
            self.inner.preview.as_ref(),
            self.inner.config.frame_poll_interval,
            self.inner.config.frame_wait_ceiling,
        )
        .await;

        let (width, height) = self.inner.preview.video_dimensions();
        info!(
            "Stream {} live (frames: {}, {}x{})",
            stream.id(),
            has_frames,
            width,
            height
        );

        // Checked and scheduled under one lock so a teardown cannot slip in
        // between
        let mut state = self.inner.state.lock().await;
        if !state.is_current(generation) || state.stream.is_none() {
            info!("Session #{} torn down while waiting for frames", generation);
            return StartOutcome::Interrupted;
        }
        self.schedule_capture(&mut state, generation, stream);

        StartOutcome::Started
    }

    fn schedule_capture(
        &self,
        state: &mut SessionState,
        generation: u64,
        stream: Arc<dyn DeviceStream>,
    ) {
        let schedule = self.inner.schedule;

        let inner = Arc::clone(&self.inner);
        let photo_task = tokio::spawn(async move {
            tokio::time::sleep(schedule.first_photo).await;
            let saved = inner.photos.capture_burst().await;
            inner.photos_saved.fetch_add(saved, Ordering::SeqCst);
        });

        let inner = Arc::clone(&self.inner);
        let video_task = tokio::spawn(async move {
            tokio::time::sleep(schedule.video_start).await;

            // Start under the lock so a concurrent teardown cannot release
            // the stream between the check and the recorder start
            let recording = {
                let mut state = inner.state.lock().await;
                if state.generation != generation || state.stream.is_none() {
                    debug!("Session #{} torn down before recording started", generation);
                    return;
                }
                let Some(recording) = inner.video.start(stream) else {
                    return;
                };
                let recording = Arc::new(recording);
                state.recording = Some(Arc::clone(&recording));
                recording
            };

            let duration = schedule.video_stop - schedule.video_start;
            if recording.stop_after(duration).await.is_some() {
                inner.videos_saved.fetch_add(1, Ordering::SeqCst);
            }
        });

        let session = self.clone();
        let reaper_task = tokio::spawn(async move {
            tokio::time::sleep(schedule.teardown).await;
            session.teardown_generation(Some(generation)).await;
        });

        state.photo_task = Some(photo_task);
        state.video_task = Some(video_task);
        state.reaper_task = Some(reaper_task);
    }

    /// Release the current session's resources.
    ///
    /// Waits for the photo burst to finish, stops the recorder if it is
    /// still running, stops every track, detaches the preview and marks the
    /// session inactive. Safe without a stream and safe to repeat.
    pub async fn teardown(&self) -> TeardownReport {
        self.teardown_generation(None).await
    }

    async fn teardown_generation(&self, generation: Option<u64>) -> TeardownReport {
        let photo_task = {
            let mut state = self.inner.state.lock().await;
            if generation.is_some_and(|g| g != state.generation) {
                debug!("Ignoring teardown timer of an earlier session");
                return TeardownReport::default();
            }
            if generation.is_some() && !state.active {
                debug!("Session #{} already torn down", state.generation);
                return TeardownReport::default();
            }
            state.photo_task.take()
        };

        if let Some(task) = photo_task {
            if !task.is_finished() {
                debug!("Waiting for photo burst before teardown");
            }
            if let Err(e) = task.await {
                warn!("Photo burst task failed: {}", e);
            }
        }

        let mut state = self.inner.state.lock().await;
        let stream = state.stream.take();
        let report = self.inner.reaper.reap(state.recording.as_deref(), stream);
        state.active = false;
        state.last_teardown = Some(report.clone());

        info!(
            "Capture session #{} torn down (recorder stopped: {}, tracks stopped: {})",
            state.generation, report.recorder_stopped, report.tracks_stopped
        );

        report
    }

    /// Wait until the scheduled teardown has run and the clip (if any) has
    /// been saved, then return final statistics.
    pub async fn wait_finished(&self) -> SessionStats {
        let (reaper_task, video_task) = {
            let mut state = self.inner.state.lock().await;
            (state.reaper_task.take(), state.video_task.take())
        };

        let reaper = async {
            if let Some(task) = reaper_task {
                if let Err(e) = task.await {
                    warn!("Teardown task failed: {}", e);
                }
            }
        };
        let video = async {
            if let Some(task) = video_task {
                if let Err(e) = task.await {
                    warn!("Video task failed: {}", e);
                }
            }
        };
        futures::future::join(reaper, video).await;

        self.stats().await
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let state = self.inner.state.lock().await;

        SessionStats {
            ready: state.ready,
            active: state.active,
            recorder_state: state
                .recording
                .as_ref()
                .map(|r| r.state())
                .unwrap_or(RecorderState::Idle),
            started_at: state.started_at,
            photos_saved: self.inner.photos_saved.load(Ordering::SeqCst),
            videos_saved: self.inner.videos_saved.load(Ordering::SeqCst),
            saves_failed: self.inner.sink.failed(),
            last_teardown: state.last_teardown.clone(),
        }
    }

    pub async fn is_active(&self) -> bool {
        self.inner.state.lock().await.active
    }

    pub async fn is_ready(&self) -> bool {
        self.inner.state.lock().await.ready
    }
}
