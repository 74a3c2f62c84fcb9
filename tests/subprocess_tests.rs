// SPDX-License-Identifier: GPL-3.0-only

//! Subprocess backend against a scripted process launcher

mod common;

use common::{Script, ScriptedLauncher, board_probe, desktop_probe, temp_store};
use photo_booth::backends::camera::subprocess::{SubprocessCamera, process};
use photo_booth::backends::camera::{Camera, CameraEvent, EventReceiver, PreviewContent, event_channel};
use photo_booth::errors::CaptureError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn camera(launcher: &ScriptedLauncher) -> (SubprocessCamera, EventReceiver, tempfile::TempDir) {
    let (store, tmp) = temp_store();
    let (tx, rx) = event_channel();
    let mut camera = SubprocessCamera::new(store, tx, board_probe(), Arc::new(launcher.clone()));
    assert!(camera.initialize());
    (camera, rx, tmp)
}

/// Next capture outcome, skipping preview notifications
async fn next_outcome(rx: &mut EventReceiver) -> Option<CameraEvent> {
    loop {
        match tokio::time::timeout(Duration::from_secs(30), rx.recv()).await {
            Ok(Some(CameraEvent::PreviewStarted | CameraEvent::PreviewStopped)) => continue,
            Ok(event) => return event,
            Err(_) => return None,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn slow_start_falls_back_to_legacy_program_once() {
    let launcher = ScriptedLauncher::new([Script::NeverStart, Script::WriteJpeg]);
    let (mut cam, mut rx, _tmp) = camera(&launcher);
    let start = Instant::now();

    cam.capture_photo();
    let event = next_outcome(&mut rx).await;

    let Some(CameraEvent::PhotoReady(asset)) = event else {
        panic!("expected a photo, got {:?}", event);
    };
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(launcher.programs(), vec!["libcamera-still", "raspistill"]);

    let launches = launcher.launches();
    let output = PathBuf::from(&launches[1].1[1]);
    assert_eq!(launches[1].1, process::legacy_args(&output));
    assert_eq!(launches[0].1, process::primary_args(&output));
    assert_eq!(asset.path, output);

    let name = asset.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("pi_photo_") && name.ends_with(".jpg"), "{}", name);
    assert_eq!((asset.width(), asset.height()), (32, 24));
}

#[tokio::test(start_paused = true)]
async fn neither_program_starting_is_reported() {
    let launcher = ScriptedLauncher::new([Script::NeverStart, Script::NeverStart]);
    let (mut cam, mut rx, _tmp) = camera(&launcher);

    cam.capture_photo();
    let event = next_outcome(&mut rx).await;

    assert!(matches!(
        event,
        Some(CameraEvent::CaptureError(CaptureError::ProcessStartFailed))
    ));
    // Exactly one fallback, never a second round
    assert_eq!(launcher.programs().len(), 2);
}

#[tokio::test]
async fn missing_primary_program_falls_back_immediately() {
    let launcher = ScriptedLauncher::new([Script::Missing, Script::WriteJpeg]);
    let (mut cam, mut rx, _tmp) = camera(&launcher);

    cam.capture_photo();
    assert!(matches!(
        next_outcome(&mut rx).await,
        Some(CameraEvent::PhotoReady(_))
    ));
    assert_eq!(launcher.programs(), vec!["libcamera-still", "raspistill"]);
}

#[tokio::test]
async fn non_zero_exit_reports_the_code() {
    let launcher = ScriptedLauncher::new([Script::Exit(2)]);
    let (mut cam, mut rx, _tmp) = camera(&launcher);

    cam.capture_photo();
    let Some(CameraEvent::CaptureError(err)) = next_outcome(&mut rx).await else {
        panic!("expected a capture error");
    };
    assert_eq!(err, CaptureError::ProcessExited { code: 2 });
    assert!(err.to_string().contains("exit code: 2"));

    // Exactly one outcome per capture
    assert!(
        tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn undecodable_output_is_a_capture_error() {
    let launcher = ScriptedLauncher::new([Script::WriteGarbage]);
    let (mut cam, mut rx, _tmp) = camera(&launcher);

    cam.capture_photo();
    assert!(matches!(
        next_outcome(&mut rx).await,
        Some(CameraEvent::CaptureError(CaptureError::DecodeFailed(_)))
    ));
}

#[tokio::test]
async fn successful_exit_without_file_is_a_capture_error() {
    let launcher = ScriptedLauncher::new([Script::Exit(0)]);
    let (mut cam, mut rx, _tmp) = camera(&launcher);

    cam.capture_photo();
    assert!(matches!(
        next_outcome(&mut rx).await,
        Some(CameraEvent::CaptureError(CaptureError::DecodeFailed(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn second_capture_while_running_is_rejected() {
    let launcher = ScriptedLauncher::new([Script::RunForever]);
    let (mut cam, mut rx, _tmp) = camera(&launcher);

    cam.capture_photo();
    cam.capture_photo();

    let Some(CameraEvent::CaptureError(err)) = next_outcome(&mut rx).await else {
        panic!("expected a capture error");
    };
    assert_eq!(err, CaptureError::InProgress);
    assert!(err.to_string().contains("in progress"));
    assert_eq!(launcher.programs().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_kills_the_program_silently() {
    let launcher = ScriptedLauncher::new([Script::RunForever, Script::Exit(2)]);
    let (mut cam, mut rx, _tmp) = camera(&launcher);

    cam.capture_photo();
    // Let the program start
    tokio::time::sleep(Duration::from_millis(10)).await;
    cam.cancel_capture();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(launcher.kills(), 1);
    assert!(
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .is_err()
    );

    // The camera stays usable
    cam.capture_photo();
    assert!(matches!(
        next_outcome(&mut rx).await,
        Some(CameraEvent::CaptureError(CaptureError::ProcessExited { code: 2 }))
    ));
}

#[tokio::test]
async fn refuses_to_initialize_off_the_board() {
    let (store, _tmp) = temp_store();
    let (tx, mut rx) = event_channel();
    let launcher = ScriptedLauncher::default();
    let mut cam = SubprocessCamera::new(store, tx, desktop_probe(true), Arc::new(launcher.clone()));

    assert!(!cam.initialize());
    assert!(!cam.is_available());

    cam.capture_photo();
    assert!(matches!(
        rx.try_recv(),
        Ok(CameraEvent::CaptureError(CaptureError::NotInitialized))
    ));
    assert!(launcher.programs().is_empty());
}

#[tokio::test]
async fn preview_placeholder_follows_preview_state() {
    let launcher = ScriptedLauncher::default();
    let (mut cam, mut rx, _tmp) = camera(&launcher);
    let surface = cam.preview_surface().unwrap();

    let detail = |content: PreviewContent| match content {
        PreviewContent::Placeholder { title, detail, .. } => (title, detail),
        PreviewContent::Frame(_) => panic!("subprocess backend has no live frames"),
    };

    assert_eq!(
        detail(surface.peek()),
        ("Raspberry Pi Camera".to_string(), "Preview".to_string())
    );

    cam.start_preview();
    cam.start_preview();
    assert_eq!(detail(surface.peek()).1, "Preview Active");
    assert!(matches!(rx.try_recv(), Ok(CameraEvent::PreviewStarted)));
    assert!(rx.try_recv().is_err());

    cam.stop_preview();
    assert_eq!(detail(surface.peek()).1, "Preview Stopped");
    assert!(matches!(rx.try_recv(), Ok(CameraEvent::PreviewStopped)));
}

#[tokio::test]
async fn cleanup_is_idempotent_and_final() {
    let launcher = ScriptedLauncher::default();
    let (mut cam, _rx, _tmp) = camera(&launcher);
    let surface = cam.preview_surface().unwrap();

    cam.cleanup();
    cam.cleanup();
    assert!(!cam.is_available());
    assert!(surface.is_released());
    assert!(!cam.initialize());
}

#[tokio::test(start_paused = true)]
async fn cleanup_kills_and_reaps_a_running_capture() {
    let launcher = ScriptedLauncher::new([Script::RunForever]);
    let (mut cam, mut rx, _tmp) = camera(&launcher);

    cam.capture_photo();
    // Let the program start
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(launcher.launches().len(), 1);

    cam.cleanup();
    tokio::time::timeout(Duration::from_secs(4), cam.settle())
        .await
        .expect("capture task outlived cleanup");

    assert_eq!(launcher.kills(), 1);
    assert!(
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .map_or(true, |event| event.is_none()),
    );
    assert!(!cam.is_available());
}
