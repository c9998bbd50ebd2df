// Integration tests for the synthetic device and the stream preview

mod common;

use std::time::Duration;

use common::small_device;
use reaction_capture::device::{
    DeviceStream, FacingMode, MediaConstraints, MediaDevices, MediaTrack, PreviewSink,
    ReadyState, StreamPreview, SyntheticDevices, VideoConstraints,
};
use reaction_capture::CaptureError;

#[tokio::test]
async fn test_rear_camera_is_unavailable() {
    let devices = SyntheticDevices::new(small_device());
    let constraints = MediaConstraints {
        video: Some(VideoConstraints {
            facing: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }),
        audio: true,
    };

    let result = devices.get_user_media(&constraints).await;

    assert!(matches!(result, Err(CaptureError::AcquisitionFailure(_))));
    assert!(devices.streams().is_empty());
}

#[tokio::test]
async fn test_audio_only_request_has_one_track() {
    let devices = SyntheticDevices::new(small_device());
    let constraints = MediaConstraints {
        video: None,
        audio: true,
    };

    let stream = devices.get_user_media(&constraints).await.unwrap();

    assert_eq!(stream.tracks().len(), 1);
    assert!(stream.grab_frame().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_preview_readiness_follows_frames() {
    let devices = SyntheticDevices::new(small_device());
    let stream = devices
        .get_user_media(&MediaConstraints::capture(1280, 720))
        .await
        .unwrap();

    let preview = StreamPreview::new();
    assert_eq!(preview.ready_state(), ReadyState::HaveNothing);

    preview.attach(stream.clone());
    preview.play().unwrap();
    assert_eq!(preview.ready_state(), ReadyState::HaveMetadata);
    assert_eq!(preview.video_dimensions(), (0, 0));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(preview.ready_state(), ReadyState::HaveEnoughData);
    assert_eq!(preview.video_dimensions(), (64, 48));

    // A stopped video track yields no more frames
    for track in stream.tracks() {
        track.stop();
        track.stop();
    }
    assert_eq!(stream.live_tracks(), 0);
    assert_eq!(preview.ready_state(), ReadyState::HaveMetadata);

    preview.detach();
    assert!(!preview.is_attached());
    assert_eq!(preview.ready_state(), ReadyState::HaveNothing);
}
