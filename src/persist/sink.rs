use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::CaptureResult;

/// Immutable binary payload tagged with its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Blob {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Transient, locally addressable reference to a registered blob
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(pub String);

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hidden, non-navigating save trigger
#[derive(Debug, Clone)]
pub struct DownloadAnchor {
    pub href: ObjectUrl,
    /// Destination filename offered to the save pathway
    pub download: String,
    pub hidden: bool,
}

/// Host save pathway
pub trait SaveHost: Send + Sync {
    fn create_object_url(&self, blob: Blob) -> CaptureResult<ObjectUrl>;

    /// Activate the anchor once; returns where the file landed
    fn trigger_download(&self, anchor: &DownloadAnchor) -> CaptureResult<PathBuf>;

    fn revoke_object_url(&self, url: &ObjectUrl);
}

/// Turns in-memory artifacts into files saved on this device.
///
/// Every save is independent: a failure is logged and only loses that one
/// artifact.
pub struct PersistenceSink {
    host: Arc<dyn SaveHost>,
    revoke_grace: Duration,
    saved: AtomicUsize,
    failed: AtomicUsize,
}

impl PersistenceSink {
    pub fn new(host: Arc<dyn SaveHost>, revoke_grace: Duration) -> Self {
        Self {
            host,
            revoke_grace,
            saved: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Save `blob` under `filename`. Returns whether the download was
    /// triggered.
    pub fn save(&self, blob: Blob, filename: &str) -> bool {
        if blob.is_empty() {
            warn!("Refusing to save empty artifact {}", filename);
            self.failed.fetch_add(1, Ordering::SeqCst);
            return false;
        }

        let size = blob.len();
        let url = match self.host.create_object_url(blob) {
            Ok(url) => url,
            Err(e) => {
                warn!("Failed to create object URL for {}: {}", filename, e);
                self.failed.fetch_add(1, Ordering::SeqCst);
                return false;
            }
        };

        let anchor = DownloadAnchor {
            href: url.clone(),
            download: filename.to_string(),
            hidden: true,
        };

        let result = self.host.trigger_download(&anchor);
        // The anchor is never reused once clicked
        drop(anchor);

        match result {
            Ok(path) => {
                info!("Saved {} ({} bytes) to {}", filename, size, path.display());
                self.saved.fetch_add(1, Ordering::SeqCst);
                self.schedule_revoke(url);
                true
            }
            Err(e) => {
                warn!("Failed to save {}: {}", filename, e);
                self.failed.fetch_add(1, Ordering::SeqCst);
                self.host.revoke_object_url(&url);
                false
            }
        }
    }

    pub fn saved(&self) -> usize {
        self.saved.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    fn schedule_revoke(&self, url: ObjectUrl) {
        let host = Arc::clone(&self.host);
        let grace = self.revoke_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            debug!("Revoking {}", url);
            host.revoke_object_url(&url);
        });
    }
}
