use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use super::sink::{Blob, DownloadAnchor, ObjectUrl, SaveHost};
use crate::error::{CaptureError, CaptureResult};

const URL_SCHEME: &str = "blob:reaction-capture/";

/// Save host backed by a downloads directory.
///
/// Object URLs are keys into an in-memory registry; activating an anchor
/// writes the registered bytes into the directory.
pub struct DownloadsHost {
    dir: PathBuf,
    registry: Mutex<HashMap<ObjectUrl, Blob>>,
}

impl DownloadsHost {
    pub fn new(dir: impl Into<PathBuf>) -> CaptureResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        info!("Downloads directory: {}", dir.display());

        Ok(Self {
            dir,
            registry: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Object URLs that have not been revoked yet
    pub fn outstanding_urls(&self) -> usize {
        self.registry.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl SaveHost for DownloadsHost {
    fn create_object_url(&self, blob: Blob) -> CaptureResult<ObjectUrl> {
        let url = ObjectUrl(format!("{}{}", URL_SCHEME, uuid::Uuid::new_v4()));
        let mut registry = self.registry.lock().map_err(|_| poisoned())?;
        registry.insert(url.clone(), blob);
        Ok(url)
    }

    fn trigger_download(&self, anchor: &DownloadAnchor) -> CaptureResult<PathBuf> {
        if !anchor.hidden {
            return Err(CaptureError::PersistenceFailure(format!(
                "anchor for {} must be hidden",
                anchor.download
            )));
        }

        let name = sanitize_filename(&anchor.download).ok_or_else(|| {
            CaptureError::PersistenceFailure(format!("invalid filename {:?}", anchor.download))
        })?;

        let bytes = {
            let registry = self.registry.lock().map_err(|_| poisoned())?;
            registry
                .get(&anchor.href)
                .map(|b| b.bytes.clone())
                .ok_or_else(|| {
                    CaptureError::PersistenceFailure(format!("{} is not registered", anchor.href))
                })?
        };

        let path = unique_path(&self.dir, &name);
        fs::write(&path, bytes)?;

        Ok(path)
    }

    fn revoke_object_url(&self, url: &ObjectUrl) {
        if let Ok(mut registry) = self.registry.lock() {
            if registry.remove(url).is_some() {
                debug!("Revoked {}", url);
            }
        }
    }
}

fn poisoned() -> CaptureError {
    CaptureError::PersistenceFailure("object URL registry poisoned".to_string())
}

/// Strip any directory components; empty names are rejected.
fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}

/// Browser-style de-duplication: `photo.jpg`, `photo (1).jpg`, ...
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    };

    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{} ({}){}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
