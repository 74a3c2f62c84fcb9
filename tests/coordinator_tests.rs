// SPDX-License-Identifier: GPL-3.0-only

//! Capture coordinator flows driven on tokio's paused clock

mod common;

use common::{RecordingCamera, Script, ScriptedLauncher, board_probe, count_calls, desktop_probe, temp_store};
use photo_booth::app::{CaptureCoordinator, CaptureState, CaptureStateKind, ChoiceCategory, CoordinatorUpdate};
use photo_booth::backends::camera::simulator::SimulatorCamera;
use photo_booth::backends::camera::subprocess::SubprocessCamera;
use photo_booth::backends::camera::{BackendKind, Camera, CameraEvent, CameraSelector, event_channel};
use photo_booth::errors::{CaptureError, CoordinatorError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn simulator_coordinator() -> (CaptureCoordinator, tempfile::TempDir) {
    let (store, tmp) = temp_store();
    let (tx, rx) = event_channel();
    let mut camera = SimulatorCamera::new(store, tx);
    assert!(camera.initialize());
    (
        CaptureCoordinator::with_camera(Some(Box::new(camera)), rx),
        tmp,
    )
}

/// Paused-clock deadlines land on whole milliseconds
fn assert_near(actual: Duration, expected: Duration) {
    let diff = actual.abs_diff(expected);
    assert!(diff <= Duration::from_millis(5), "expected {:?}, got {:?}", expected, actual);
}

/// Pull updates until `pred` matches, returning everything seen
async fn updates_until(
    coordinator: &mut CaptureCoordinator,
    pred: impl Fn(&CoordinatorUpdate) -> bool,
) -> Vec<CoordinatorUpdate> {
    let mut seen = Vec::new();
    loop {
        let update = tokio::time::timeout(Duration::from_secs(60), coordinator.next_update())
            .await
            .expect("coordinator stalled");
        let done = pred(&update);
        seen.push(update);
        if done {
            return seen;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn happy_path_with_simulator() {
    let (mut coordinator, _tmp) = simulator_coordinator();
    coordinator.new_session();

    coordinator.begin().unwrap();
    assert_eq!(coordinator.state().kind(), CaptureStateKind::Previewing);

    let start = Instant::now();
    coordinator.request_capture().unwrap();
    assert_eq!(coordinator.state().overlay_text().as_deref(), Some("3"));

    let mut overlays = vec![coordinator.state().overlay_text()];
    let updates = updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::PhotoReady(_))).await;
    let mut photo = None;
    for update in &updates {
        match update {
            CoordinatorUpdate::Countdown(_) | CoordinatorUpdate::CaptureIndicator => {
                overlays.push(coordinator_overlay_for(update));
            }
            CoordinatorUpdate::PhotoReady(asset) => photo = Some(asset.clone()),
            _ => {}
        }
    }

    assert_eq!(
        overlays,
        vec![
            Some("3".to_string()),
            Some("2".to_string()),
            Some("1".to_string()),
            Some("📸".to_string()),
        ]
    );

    assert_near(start.elapsed(), Duration::from_millis(4500));

    let photo = photo.unwrap();
    let name = photo.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("mock_photo_") && name.ends_with(".png"), "{}", name);
    assert_eq!((photo.width(), photo.height()), (800, 600));
    assert!(photo.path.is_file());

    assert_eq!(coordinator.state().kind(), CaptureStateKind::Reviewing);
    assert!(coordinator.state().shows_review_actions());
    assert_eq!(
        coordinator.session().unwrap().captured_photo_path(),
        Some(photo.path.as_path())
    );
    let photo_updates = updates
        .iter()
        .filter(|u| matches!(u, CoordinatorUpdate::PhotoReady(_)))
        .count();
    assert_eq!(photo_updates, 1);
}

fn coordinator_overlay_for(update: &CoordinatorUpdate) -> Option<String> {
    match update {
        CoordinatorUpdate::Countdown(remaining) => {
            CaptureState::CountingDown { remaining: *remaining }.overlay_text()
        }
        CoordinatorUpdate::CaptureIndicator => CaptureState::Capturing.overlay_text(),
        _ => None,
    }
}

#[tokio::test(start_paused = true)]
async fn countdown_ticks_once_per_second() {
    let (mut coordinator, _tmp) = simulator_coordinator();
    coordinator.begin().unwrap();
    coordinator.request_capture().unwrap();
    let start = Instant::now();

    for expected in [2, 1] {
        let updates = updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::Countdown(_))).await;
        assert!(matches!(updates.last(), Some(CoordinatorUpdate::Countdown(n)) if *n == expected));
        assert_eq!(
            coordinator.state(),
            &CaptureState::CountingDown { remaining: expected }
        );
    }
    assert_near(start.elapsed(), Duration::from_secs(2));

    let updates = updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::CaptureIndicator)).await;
    assert_eq!(updates.len(), 1);
    assert_near(start.elapsed(), Duration::from_secs(3));
    assert_eq!(coordinator.state().kind(), CaptureStateKind::Capturing);

    updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::CaptureStarted)).await;
    assert_near(start.elapsed(), Duration::from_millis(3500));
}

#[tokio::test(start_paused = true)]
async fn retake_returns_to_preview() {
    let (store, _tmp) = temp_store();
    let (tx, rx) = event_channel();
    let mut simulator = SimulatorCamera::new(store, tx);
    assert!(simulator.initialize());
    let (camera, calls) = RecordingCamera::new(Box::new(simulator));
    let mut coordinator = CaptureCoordinator::with_camera(Some(Box::new(camera)), rx);

    coordinator.begin().unwrap();
    coordinator.request_capture().unwrap();
    updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::PhotoReady(_))).await;
    assert!(coordinator.session().unwrap().captured_photo_path().is_some());

    let starts_before = count_calls(&calls, "start_preview");
    coordinator.retake().unwrap();

    assert_eq!(coordinator.state().kind(), CaptureStateKind::Previewing);
    assert_eq!(coordinator.session().unwrap().captured_photo_path(), None);
    assert_eq!(count_calls(&calls, "start_preview"), starts_before + 1);
    assert!(coordinator.state().accepts_capture());
}

#[tokio::test(start_paused = true)]
async fn process_failure_shows_error_then_recovers() {
    let (store, _tmp) = temp_store();
    let (tx, rx) = event_channel();
    let launcher = ScriptedLauncher::new([Script::Exit(2)]);
    let mut camera = SubprocessCamera::new(store, tx, board_probe(), Arc::new(launcher.clone()));
    assert!(camera.initialize());
    let mut coordinator =
        CaptureCoordinator::with_camera(Some(Box::new(camera)), rx).with_countdown(1);

    coordinator.begin().unwrap();
    coordinator.request_capture().unwrap();

    let updates = updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::CaptureFailed(_))).await;
    let Some(CoordinatorUpdate::CaptureFailed(message)) = updates.last() else {
        unreachable!();
    };
    assert!(message.contains("exit code: 2"), "{}", message);
    assert_eq!(coordinator.state().kind(), CaptureStateKind::Errored);
    assert_eq!(coordinator.state().overlay_text().as_deref(), Some("Error!"));

    let failed_at = Instant::now();
    let updates = updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::Recovered)).await;
    assert_eq!(updates.len(), 1);
    assert_near(failed_at.elapsed(), Duration::from_secs(3));
    assert_eq!(coordinator.state().kind(), CaptureStateKind::Previewing);
    assert_eq!(launcher.programs(), vec!["libcamera-still"]);
}

#[tokio::test]
async fn begin_then_cancel_drops_the_session() {
    let (mut coordinator, _tmp) = simulator_coordinator();
    coordinator.begin().unwrap();
    assert!(coordinator.session().is_some());

    coordinator.cancel();
    assert_eq!(coordinator.state(), &CaptureState::Idle);
    assert!(coordinator.session().is_none());
}

#[tokio::test(start_paused = true)]
async fn finish_ends_the_run() {
    let (store, _tmp) = temp_store();
    let (tx, rx) = event_channel();
    let mut simulator = SimulatorCamera::new(store, tx);
    assert!(simulator.initialize());
    let (camera, calls) = RecordingCamera::new(Box::new(simulator));
    let mut coordinator =
        CaptureCoordinator::with_camera(Some(Box::new(camera)), rx).with_countdown(1);

    coordinator.begin().unwrap();
    coordinator.request_capture().unwrap();
    updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::PhotoReady(_))).await;
    assert_eq!(coordinator.state().kind(), CaptureStateKind::Reviewing);

    let stops_before = count_calls(&calls, "stop_preview");
    coordinator.finish().unwrap();

    assert_eq!(coordinator.state(), &CaptureState::Idle);
    assert!(coordinator.session().is_none());
    assert_eq!(count_calls(&calls, "stop_preview"), stops_before + 1);
    assert!(coordinator.finish().is_err());
}

#[tokio::test(start_paused = true)]
async fn capture_error_while_reviewing_is_ignored() {
    let (store, _tmp) = temp_store();
    let (tx, rx) = event_channel();
    let mut camera = SimulatorCamera::new(store, tx.clone());
    assert!(camera.initialize());
    let mut coordinator =
        CaptureCoordinator::with_camera(Some(Box::new(camera)), rx).with_countdown(1);

    coordinator.begin().unwrap();
    coordinator.request_capture().unwrap();
    updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::PhotoReady(_))).await;

    tx.send(CameraEvent::CaptureError(CaptureError::Device(
        "camera unplugged".to_string(),
    )))
    .unwrap();

    let updates = coordinator.process_pending();
    assert!(
        !updates
            .iter()
            .any(|u| matches!(u, CoordinatorUpdate::CaptureFailed(_))),
        "{:?}",
        updates
    );
    assert_eq!(coordinator.state().kind(), CaptureStateKind::Reviewing);

    // No error dwell was armed
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(coordinator.process_pending().is_empty());
    assert_eq!(coordinator.state().kind(), CaptureStateKind::Reviewing);
    assert!(coordinator.session().unwrap().captured_photo_path().is_some());
}

#[tokio::test(start_paused = true)]
async fn cancel_during_countdown_stops_the_timer() {
    let (store, _tmp) = temp_store();
    let (tx, rx) = event_channel();
    let mut simulator = SimulatorCamera::new(store, tx);
    assert!(simulator.initialize());
    let (camera, calls) = RecordingCamera::new(Box::new(simulator));
    let mut coordinator = CaptureCoordinator::with_camera(Some(Box::new(camera)), rx);

    coordinator.begin().unwrap();
    coordinator.request_capture().unwrap();
    assert_eq!(
        coordinator.state(),
        &CaptureState::CountingDown { remaining: 3 }
    );

    coordinator.cancel();
    assert_eq!(coordinator.state(), &CaptureState::Idle);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let updates = coordinator.process_pending();
    assert!(
        !updates.iter().any(|u| matches!(
            u,
            CoordinatorUpdate::Countdown(_)
                | CoordinatorUpdate::CaptureIndicator
                | CoordinatorUpdate::CaptureStarted
        )),
        "{:?}",
        updates
    );
    assert_eq!(coordinator.state(), &CaptureState::Idle);
    assert_eq!(count_calls(&calls, "capture_photo"), 0);
}

#[tokio::test]
async fn begin_is_idempotent_while_previewing() {
    let (store, _tmp) = temp_store();
    let (tx, rx) = event_channel();
    let mut simulator = SimulatorCamera::new(store, tx);
    assert!(simulator.initialize());
    let (camera, calls) = RecordingCamera::new(Box::new(simulator));
    let mut coordinator = CaptureCoordinator::with_camera(Some(Box::new(camera)), rx);

    coordinator.begin().unwrap();
    coordinator.begin().unwrap();
    assert_eq!(count_calls(&calls, "start_preview"), 1);

    let updates = coordinator.process_pending();
    let started = updates
        .iter()
        .filter(|u| matches!(u, CoordinatorUpdate::PreviewStarted))
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn intents_in_the_wrong_state_are_rejected() {
    let (mut coordinator, _tmp) = simulator_coordinator();

    assert_eq!(
        coordinator.request_capture(),
        Err(CoordinatorError::InvalidIntent {
            intent: "request_capture",
            state: CaptureStateKind::Idle,
        })
    );
    assert!(coordinator.retake().is_err());
    assert!(coordinator.finish().is_err());
    assert_eq!(coordinator.state(), &CaptureState::Idle);

    coordinator.begin().unwrap();
    coordinator.request_capture().unwrap();
    // A second "Take Photo" during the countdown changes nothing
    assert!(coordinator.request_capture().is_err());
    assert_eq!(
        coordinator.state(),
        &CaptureState::CountingDown { remaining: 3 }
    );
}

#[tokio::test]
async fn no_camera_disables_capture() {
    let (_tx, rx) = event_channel();
    let mut coordinator = CaptureCoordinator::with_camera(None, rx);

    assert!(!coordinator.is_capture_enabled());
    assert_eq!(coordinator.begin(), Err(CoordinatorError::CameraUnavailable));
    assert_eq!(coordinator.state(), &CaptureState::Idle);
    assert!(coordinator.preview_surface().is_none());
    assert!(coordinator.process_pending().is_empty());
}

#[tokio::test]
async fn failed_backend_falls_back_to_simulator() {
    let (store, _tmp) = temp_store();
    let selector = CameraSelector::new(store)
        .with_probe(desktop_probe(false))
        .with_launcher(Arc::new(ScriptedLauncher::default()))
        .with_dev_host_override(false);

    // The subprocess backend refuses to initialise off the board
    let coordinator = CaptureCoordinator::open(&selector, BackendKind::Subprocess);
    assert_eq!(coordinator.camera_kind(), Some(BackendKind::Simulator));
    assert!(coordinator.is_capture_enabled());
}

#[tokio::test(start_paused = true)]
async fn late_photo_after_cancel_is_ignored() {
    let (store, _tmp) = temp_store();
    let (tx, rx) = event_channel();
    let mut camera = SimulatorCamera::new(store.clone(), tx.clone());
    assert!(camera.initialize());
    let mut coordinator =
        CaptureCoordinator::with_camera(Some(Box::new(camera)), rx).with_countdown(1);

    coordinator.begin().unwrap();
    coordinator.request_capture().unwrap();
    updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::CaptureStarted)).await;
    coordinator.cancel();
    assert_eq!(coordinator.state(), &CaptureState::Idle);

    // A completion racing the cancel arrives afterwards
    let path = store.dir().join("late.png");
    image::RgbaImage::new(8, 8).save(&path).unwrap();
    let image = Arc::new(image::open(&path).unwrap().to_rgba8());
    tx.send(CameraEvent::PhotoReady(photo_booth::backends::camera::PhotoAsset {
        image,
        path,
    }))
    .unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let updates = coordinator.process_pending();
    assert!(
        !updates
            .iter()
            .any(|u| matches!(u, CoordinatorUpdate::PhotoReady(_))),
        "{:?}",
        updates
    );
    assert_eq!(coordinator.state(), &CaptureState::Idle);
    assert!(coordinator.session().is_none());
}

#[tokio::test]
async fn choices_and_name_are_recorded() {
    let (mut coordinator, _tmp) = simulator_coordinator();
    coordinator.new_session();
    coordinator.choose(ChoiceCategory::Weapon, "weapon2").unwrap();
    coordinator.choose(ChoiceCategory::Land, "land4").unwrap();
    assert!(matches!(
        coordinator.choose(ChoiceCategory::Companion, "weapon1"),
        Err(CoordinatorError::UnknownChoice(_))
    ));
    coordinator.set_user_name("  Ada ");
    assert_eq!(coordinator.session().unwrap().user_name(), "Ada");
    assert_eq!(
        coordinator.session().unwrap().choice(ChoiceCategory::Weapon),
        Some("weapon2")
    );

    coordinator.begin().unwrap();
    coordinator.cancel();
    assert!(coordinator.session().is_none());
}

#[tokio::test]
async fn shutdown_releases_the_camera() {
    let (mut coordinator, _tmp) = simulator_coordinator();
    let surface = coordinator.preview_surface().unwrap();
    coordinator.begin().unwrap();

    coordinator.shutdown();
    assert_eq!(coordinator.camera_kind(), None);
    assert!(surface.is_released());
    assert_eq!(coordinator.begin(), Err(CoordinatorError::CameraUnavailable));
}

#[tokio::test(start_paused = true)]
async fn close_waits_for_a_running_capture_program() {
    let (store, _tmp) = temp_store();
    let (tx, rx) = event_channel();
    let launcher = ScriptedLauncher::new([Script::RunForever]);
    let mut camera = SubprocessCamera::new(store, tx, board_probe(), Arc::new(launcher.clone()));
    assert!(camera.initialize());
    let (camera, calls) = RecordingCamera::new(Box::new(camera));
    let mut coordinator =
        CaptureCoordinator::with_camera(Some(Box::new(camera)), rx).with_countdown(1);

    coordinator.begin().unwrap();
    coordinator.request_capture().unwrap();
    updates_until(&mut coordinator, |u| matches!(u, CoordinatorUpdate::CaptureStarted)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    coordinator.close().await;

    assert_eq!(launcher.kills(), 1);
    assert_eq!(count_calls(&calls, "cleanup"), 1);
    assert_eq!(count_calls(&calls, "settle"), 1);
    assert_eq!(coordinator.camera_kind(), None);
    assert_eq!(coordinator.state(), &CaptureState::Idle);
}
