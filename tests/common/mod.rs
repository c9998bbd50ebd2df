// Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reaction_capture::device::{
    DeviceBackend, RecorderFactory, StreamPreview, SyntheticConfig, SyntheticDevices,
};
use reaction_capture::persist::{Blob, DownloadAnchor, ObjectUrl, SaveHost};
use reaction_capture::{CaptureConfig, CaptureError, CaptureResult, CaptureSession};
use tokio::time::Instant;

/// A file the in-memory host "downloaded"
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub at: Instant,
}

/// Save host that keeps everything in memory and records when each
/// download was triggered
#[derive(Default)]
pub struct MemorySaveHost {
    registry: Mutex<HashMap<ObjectUrl, Blob>>,
    saved: Mutex<Vec<SavedFile>>,
    revoked: Mutex<Vec<ObjectUrl>>,
    next_id: Mutex<u64>,
    /// Filenames whose download should fail
    pub fail_for: Mutex<Vec<String>>,
}

impl MemorySaveHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saved(&self) -> Vec<SavedFile> {
        self.saved.lock().unwrap().clone()
    }

    pub fn saved_named(&self, prefix: &str) -> Vec<SavedFile> {
        self.saved()
            .into_iter()
            .filter(|f| f.filename.starts_with(prefix))
            .collect()
    }

    pub fn revoked(&self) -> usize {
        self.revoked.lock().unwrap().len()
    }

    pub fn outstanding(&self) -> usize {
        self.registry.lock().unwrap().len()
    }
}

impl SaveHost for MemorySaveHost {
    fn create_object_url(&self, blob: Blob) -> CaptureResult<ObjectUrl> {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        let url = ObjectUrl(format!("blob:test/{}", id));
        self.registry.lock().unwrap().insert(url.clone(), blob);
        Ok(url)
    }

    fn trigger_download(&self, anchor: &DownloadAnchor) -> CaptureResult<PathBuf> {
        if self.fail_for.lock().unwrap().contains(&anchor.download) {
            return Err(CaptureError::PersistenceFailure("simulated failure".to_string()));
        }
        let blob = self
            .registry
            .lock()
            .unwrap()
            .get(&anchor.href)
            .cloned()
            .ok_or_else(|| CaptureError::PersistenceFailure("unknown url".to_string()))?;
        self.saved.lock().unwrap().push(SavedFile {
            filename: anchor.download.clone(),
            mime: blob.mime,
            bytes: blob.bytes,
            at: Instant::now(),
        });
        Ok(PathBuf::from(&anchor.download))
    }

    fn revoke_object_url(&self, url: &ObjectUrl) {
        if self.registry.lock().unwrap().remove(url).is_some() {
            self.revoked.lock().unwrap().push(url.clone());
        }
    }
}

/// Synthetic device with a small frame so tests stay fast
pub fn small_device() -> SyntheticConfig {
    SyntheticConfig {
        width: 64,
        height: 48,
        ..SyntheticConfig::default()
    }
}

pub struct Harness {
    pub session: CaptureSession,
    pub devices: Arc<SyntheticDevices>,
    pub preview: Arc<StreamPreview>,
    pub host: Arc<MemorySaveHost>,
}

/// Session wired to a synthetic device and an in-memory save host
pub fn harness(device: SyntheticConfig, config: CaptureConfig) -> Harness {
    let recorder_available = device.recorder_available;
    let devices = Arc::new(SyntheticDevices::new(device));
    let preview = Arc::new(StreamPreview::new());
    let host = MemorySaveHost::new();

    let backend = DeviceBackend {
        devices: devices.clone(),
        recorders: if recorder_available {
            Some(devices.clone() as Arc<dyn RecorderFactory>)
        } else {
            None
        },
        preview: preview.clone(),
    };

    let session = CaptureSession::new(config, backend, host.clone(), None)
        .expect("valid capture config");

    Harness {
        session,
        devices,
        preview,
        host,
    }
}

pub fn ms(d: Duration) -> u128 {
    d.as_millis()
}
