// Integration tests for local persistence
//
// These tests verify that artifacts land in the downloads directory and
// that object URLs are released after the grace delay.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MemorySaveHost;
use reaction_capture::persist::{Blob, DownloadAnchor, DownloadsHost, PersistenceSink, SaveHost};
use tempfile::TempDir;

fn downloads() -> (TempDir, Arc<DownloadsHost>) {
    let dir = TempDir::new().unwrap();
    let host = Arc::new(DownloadsHost::new(dir.path().join("Downloads")).unwrap());
    (dir, host)
}

#[tokio::test(start_paused = true)]
async fn test_save_writes_file_and_revokes_later() {
    let (_dir, host) = downloads();
    let sink = PersistenceSink::new(host.clone(), Duration::from_millis(2_000));

    assert!(sink.save(Blob::new(b"jpeg-bytes".to_vec(), "image/jpeg"), "reaction_photo_1.jpg"));

    let path = host.dir().join("reaction_photo_1.jpg");
    assert_eq!(std::fs::read(&path).unwrap(), b"jpeg-bytes");
    assert_eq!(sink.saved(), 1);
    assert_eq!(host.outstanding_urls(), 1, "URL outlives the click");

    tokio::time::sleep(Duration::from_millis(1_999)).await;
    assert_eq!(host.outstanding_urls(), 1, "Still within the grace delay");

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(host.outstanding_urls(), 0, "Revoked after the grace delay");
}

#[tokio::test]
async fn test_name_clash_gets_suffix() {
    let (_dir, host) = downloads();
    let sink = PersistenceSink::new(host.clone(), Duration::from_millis(2_000));

    assert!(sink.save(Blob::new(b"first".to_vec(), "image/jpeg"), "x.jpg"));
    assert!(sink.save(Blob::new(b"second".to_vec(), "image/jpeg"), "x.jpg"));

    assert_eq!(std::fs::read(host.dir().join("x.jpg")).unwrap(), b"first");
    assert_eq!(std::fs::read(host.dir().join("x (1).jpg")).unwrap(), b"second");
}

#[tokio::test]
async fn test_filename_cannot_escape_directory() {
    let (dir, host) = downloads();
    let url = host
        .create_object_url(Blob::new(b"data".to_vec(), "image/jpeg"))
        .unwrap();
    assert!(url.0.starts_with("blob:reaction-capture/"));

    let anchor = DownloadAnchor {
        href: url,
        download: "../evil.jpg".to_string(),
        hidden: true,
    };
    let path = host.trigger_download(&anchor).unwrap();

    assert_eq!(path, host.dir().join("evil.jpg"));
    assert!(!dir.path().join("evil.jpg").exists());
}

#[tokio::test]
async fn test_unregistered_url_fails() {
    let (_dir, host) = downloads();
    let url = host
        .create_object_url(Blob::new(b"data".to_vec(), "video/webm"))
        .unwrap();
    host.revoke_object_url(&url);

    let anchor = DownloadAnchor {
        href: url,
        download: "reaction_video.webm".to_string(),
        hidden: true,
    };

    assert!(host.trigger_download(&anchor).is_err());
}

#[tokio::test]
async fn test_failed_save_revokes_immediately() {
    let host = MemorySaveHost::new();
    host.fail_for
        .lock()
        .unwrap()
        .push("reaction_video.webm".to_string());
    let sink = PersistenceSink::new(host.clone(), Duration::from_millis(2_000));

    assert!(!sink.save(Blob::new(b"clip".to_vec(), "video/webm"), "reaction_video.webm"));

    assert_eq!(sink.failed(), 1);
    assert_eq!(sink.saved(), 0);
    assert_eq!(host.revoked(), 1);
    assert_eq!(host.outstanding(), 0);

    // The next save is unaffected
    assert!(sink.save(Blob::new(b"still".to_vec(), "image/jpeg"), "reaction_photo_1.jpg"));
    assert_eq!(sink.saved(), 1);
}

#[tokio::test]
async fn test_visible_anchor_is_rejected() {
    let (_dir, host) = downloads();
    let url = host
        .create_object_url(Blob::new(b"data".to_vec(), "image/jpeg"))
        .unwrap();

    let anchor = DownloadAnchor {
        href: url,
        download: "reaction_photo_1.jpg".to_string(),
        hidden: false,
    };

    assert!(host.trigger_download(&anchor).is_err());
    assert!(!host.dir().join("reaction_photo_1.jpg").exists());
}

#[tokio::test]
async fn test_empty_blob_is_not_saved() {
    let host = MemorySaveHost::new();
    let sink = PersistenceSink::new(host.clone(), Duration::from_millis(2_000));

    let blob = Blob::new(Vec::new(), "video/webm");
    assert!(blob.is_empty());
    assert!(!sink.save(blob, "reaction_video.webm"));

    assert_eq!(sink.failed(), 1);
    assert!(host.saved().is_empty());
    assert_eq!(host.outstanding(), 0, "No object URL was created");
}
