//! Local persistence of captured artifacts
//!
//! Artifacts are never sent anywhere: each one becomes a file in the
//! downloads directory through a transient object URL and a one-shot
//! download trigger.

mod downloads;
mod sink;

pub use downloads::DownloadsHost;
pub use sink::{Blob, DownloadAnchor, ObjectUrl, PersistenceSink, SaveHost};
