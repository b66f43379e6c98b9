// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the camera session state machine

mod common;

use common::{MockBackend, RECORDED_BYTES};
use detect_camera::app::{CameraSession, CameraStatus, CaptureSettings};
use detect_camera::backends::camera::{CameraBackend, FacingMode, FrameSize};
use detect_camera::backends::virtual_camera::VirtualCameraBackend;
use detect_camera::errors::CameraError;
use detect_camera::media::MediaKind;
use std::sync::Arc;
use std::time::Duration;

fn new_session(backend: &Arc<MockBackend>) -> (CameraSession, detect_camera::app::CaptureReceiver) {
    let backend: Arc<dyn CameraBackend> = backend.clone();
    CameraSession::new(backend, CaptureSettings::default())
}

#[tokio::test]
async fn test_open_prefers_rear_camera() {
    let backend = MockBackend::new();
    let (session, _captures) = new_session(&backend);

    session.open(FacingMode::Environment).await.unwrap();

    assert_eq!(session.state(), CameraStatus::Live);
    assert_eq!(backend.calls(), vec![FacingMode::Environment]);
    assert_eq!(backend.live_streams(), 1);
    assert!(session.preview_frame().is_some());
}

#[tokio::test]
async fn test_open_falls_back_to_any_camera() {
    let backend = MockBackend::new().without_rear_camera();
    let (session, _captures) = new_session(&backend);

    session.open(FacingMode::Environment).await.unwrap();

    assert_eq!(session.state(), CameraStatus::Live);
    assert_eq!(
        backend.calls(),
        vec![FacingMode::Environment, FacingMode::Any]
    );
}

#[tokio::test]
async fn test_open_without_cameras_fails_closed() {
    let backend = MockBackend::new().without_cameras();
    let (session, _captures) = new_session(&backend);

    let result = session.open(FacingMode::Environment).await;

    assert!(matches!(result, Err(CameraError::DeviceUnavailable)));
    assert_eq!(session.state(), CameraStatus::Closed);
    assert_eq!(backend.live_streams(), 0);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let backend = MockBackend::new();
    let (session, _captures) = new_session(&backend);

    session.close();
    session.open(FacingMode::Environment).await.unwrap();
    session.close();
    session.close();

    assert_eq!(session.state(), CameraStatus::Closed);
    assert_eq!(backend.stopped_streams(), 1);
    assert_eq!(backend.live_streams(), 0);
    assert!(session.preview_frame().is_none());
}

#[tokio::test]
async fn test_open_close_cycles_never_hold_two_streams() {
    let backend = MockBackend::new();
    let (session, _captures) = new_session(&backend);

    for _ in 0..5 {
        session.open(FacingMode::Environment).await.unwrap();
        // A second open while live does not acquire again
        session.open(FacingMode::Environment).await.unwrap();
        assert_eq!(backend.live_streams(), 1);
        session.close();
        assert_eq!(backend.live_streams(), 0);
    }

    assert_eq!(backend.calls().len(), 5);
    assert_eq!(backend.stopped_streams(), 5);
}

#[tokio::test]
async fn test_close_while_opening_releases_late_stream() {
    let (backend, gate) = MockBackend::new().gated();
    let (session, _captures) = new_session(&backend);

    let open = session.open(FacingMode::Environment);
    let closer = async {
        tokio::task::yield_now().await;
        assert_eq!(session.state(), CameraStatus::Opening);
        session.close();
        gate.notify_one();
    };
    let (result, ()) = tokio::join!(open, closer);

    assert!(matches!(result, Err(CameraError::OpenCancelled)));
    assert_eq!(session.state(), CameraStatus::Closed);
    assert_eq!(backend.live_streams(), 0);
    assert_eq!(backend.stopped_streams(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_open_returns_to_closed() {
    let (backend, _gate) = MockBackend::new().gated();
    let (session, _captures) = new_session(&backend);

    let timed_out =
        tokio::time::timeout(Duration::from_millis(20), session.open(FacingMode::Environment))
            .await;
    assert!(timed_out.is_err());
    assert_eq!(session.state(), CameraStatus::Closed);

    *backend.gate.lock().unwrap() = None;
    session.open(FacingMode::Environment).await.unwrap();

    assert_eq!(session.state(), CameraStatus::Live);
    assert_eq!(
        backend.calls(),
        vec![FacingMode::Environment, FacingMode::Environment]
    );
    assert_eq!(backend.live_streams(), 1);
}

#[tokio::test]
async fn test_second_open_while_opening_is_rejected() {
    let (backend, gate) = MockBackend::new().gated();
    let (session, _captures) = new_session(&backend);

    let first = session.open(FacingMode::Environment);
    let second = async {
        tokio::task::yield_now().await;
        let result = session.open(FacingMode::Environment).await;
        gate.notify_one();
        result
    };
    let (first, second) = tokio::join!(first, second);

    first.unwrap();
    assert!(matches!(second, Err(CameraError::OpenInProgress)));
    assert_eq!(session.state(), CameraStatus::Live);
    assert_eq!(backend.calls(), vec![FacingMode::Environment]);
}

#[tokio::test]
async fn test_capture_still_emits_one_image_and_closes() {
    let backend = MockBackend::new();
    let (session, mut captures) = new_session(&backend);

    session.open(FacingMode::Environment).await.unwrap();
    session.capture_still().await.unwrap();

    let artifact = captures.try_recv().unwrap();
    assert_eq!(artifact.kind(), MediaKind::Image);
    assert_eq!(artifact.mime(), "image/jpeg");
    let decoded = image::load_from_memory(artifact.data()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));

    assert!(captures.try_recv().is_err());
    assert_eq!(session.state(), CameraStatus::Closed);
    assert_eq!(backend.live_streams(), 0);
}

#[tokio::test]
async fn test_capture_still_uses_fallback_size() {
    let backend = MockBackend::new().with_native_size(None);
    let settings = CaptureSettings {
        fallback_size: FrameSize::new(40, 30),
        ..CaptureSettings::default()
    };
    let (session, mut captures) = CameraSession::new(backend.clone(), settings);

    session.open(FacingMode::Environment).await.unwrap();
    session.capture_still().await.unwrap();

    let artifact = captures.try_recv().unwrap();
    let decoded = image::load_from_memory(artifact.data()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 30));
}

#[tokio::test]
async fn test_capture_and_recording_outside_live_are_noops() {
    let backend = MockBackend::new();
    let (session, mut captures) = new_session(&backend);

    session.capture_still().await.unwrap();
    session.start_recording(Duration::from_secs(1)).unwrap();
    session.stop_recording().await;

    assert_eq!(session.state(), CameraStatus::Closed);
    assert!(captures.try_recv().is_err());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_manual_stop_emits_recording_and_closes() {
    let backend = MockBackend::new();
    let (session, mut captures) = new_session(&backend);

    session.open(FacingMode::Environment).await.unwrap();
    session.start_recording(Duration::from_secs(10)).unwrap();
    assert!(session.state().is_recording());
    assert_eq!(
        session.recording_format().map(|f| f.mime),
        Some("video/webm".to_string())
    );

    session.stop_recording().await;

    let artifact = captures.try_recv().unwrap();
    assert_eq!(artifact.kind(), MediaKind::Video);
    assert_eq!(artifact.mime(), "video/webm");
    assert_eq!(&artifact.data()[..], &RECORDED_BYTES);
    assert!(artifact.filename().ends_with(".webm"));

    assert_eq!(session.state(), CameraStatus::Closed);
    assert_eq!(backend.live_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_auto_stop_emits_exactly_one_artifact() {
    let backend = MockBackend::new();
    let (session, mut captures) = new_session(&backend);

    session.open(FacingMode::Environment).await.unwrap();
    session.start_recording(Duration::from_millis(500)).unwrap();

    let artifact = captures.recv().await.unwrap();
    assert_eq!(&artifact.data()[..], &RECORDED_BYTES);
    assert_eq!(session.state(), CameraStatus::Closed);

    // The manual stop lost the race and does nothing
    session.stop_recording().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(captures.try_recv().is_err());
    assert_eq!(backend.stopped_streams(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_and_manual_stop_produce_the_same_artifact() {
    let deadline_backend = MockBackend::new();
    let (deadline_session, mut deadline_captures) = new_session(&deadline_backend);
    deadline_session
        .open(FacingMode::Environment)
        .await
        .unwrap();
    deadline_session
        .start_recording(Duration::from_millis(300))
        .unwrap();
    let by_deadline = deadline_captures.recv().await.unwrap();

    let manual_backend = MockBackend::new();
    let (manual_session, mut manual_captures) = new_session(&manual_backend);
    manual_session.open(FacingMode::Environment).await.unwrap();
    manual_session
        .start_recording(Duration::from_secs(10))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    manual_session.stop_recording().await;
    let by_hand = manual_captures.try_recv().unwrap();

    assert_eq!(by_deadline.kind(), by_hand.kind());
    assert_eq!(by_deadline.mime(), by_hand.mime());
    assert_eq!(by_deadline.data(), by_hand.data());
}

#[tokio::test]
async fn test_recording_format_ranking() {
    let backend = MockBackend::new().with_formats(&["video/webm", "video/mp4"]);
    let (session, _captures) = new_session(&backend);
    session.open(FacingMode::Environment).await.unwrap();
    session.start_recording(Duration::from_secs(10)).unwrap();
    assert_eq!(
        session.recording_format().map(|f| f.mime),
        Some("video/mp4".to_string())
    );
    session.close();

    let backend = MockBackend::new().with_formats(&[]);
    let (session, _captures) = new_session(&backend);
    session.open(FacingMode::Environment).await.unwrap();
    session.start_recording(Duration::from_secs(10)).unwrap();
    assert_eq!(
        session.recording_format().map(|f| f.mime),
        Some("video/webm".to_string())
    );
}

#[tokio::test]
async fn test_unranked_format_records_with_first_offered() {
    let backend = MockBackend::new().with_formats(&["video/x-matroska"]);
    let (session, _captures) = new_session(&backend);
    session.open(FacingMode::Environment).await.unwrap();

    session.start_recording(Duration::from_secs(10)).unwrap();

    assert!(session.state().is_recording());
    assert_eq!(
        session.recording_format().map(|f| f.mime),
        Some("video/x-matroska".to_string())
    );
}

#[tokio::test]
async fn test_virtual_camera_records_matroska_clip() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mkv");
    let bytes = vec![0x1a, 0x45, 0xdf, 0xa3, 7, 7, 7, 7];
    std::fs::write(&clip, &bytes).unwrap();

    let backend: Arc<dyn CameraBackend> = Arc::new(VirtualCameraBackend::new(None, Some(clip)));
    let (session, mut captures) = CameraSession::new(backend, CaptureSettings::default());
    session.open(FacingMode::Environment).await.unwrap();

    session.start_recording(Duration::from_secs(1)).unwrap();
    assert!(session.state().is_recording());
    session.stop_recording().await;

    let artifact = captures.try_recv().unwrap();
    assert_eq!(artifact.kind(), MediaKind::Video);
    assert_eq!(artifact.mime(), "video/x-matroska");
    assert!(artifact.filename().ends_with(".mkv"));
    assert_eq!(&artifact.data()[..], &bytes[..]);
    assert_eq!(session.state(), CameraStatus::Closed);
}

#[tokio::test]
async fn test_close_while_recording_discards_clip() {
    let backend = MockBackend::new();
    let (session, mut captures) = new_session(&backend);

    session.open(FacingMode::Environment).await.unwrap();
    session.start_recording(Duration::from_secs(10)).unwrap();
    session.close();
    tokio::task::yield_now().await;

    assert!(captures.try_recv().is_err());
    assert_eq!(session.state(), CameraStatus::Closed);
    assert_eq!(backend.live_streams(), 0);
}

#[tokio::test]
async fn test_drop_releases_camera() {
    let backend = MockBackend::new();
    let (session, _captures) = new_session(&backend);

    session.open(FacingMode::Environment).await.unwrap();
    session.start_recording(Duration::from_secs(10)).unwrap();
    drop(session);

    assert_eq!(backend.live_streams(), 0);
    assert_eq!(backend.stopped_streams(), 1);
}
