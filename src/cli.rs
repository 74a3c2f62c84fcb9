// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! - Reporting which backend this host would use
//! - Taking a single photo without the kiosk

use photo_booth::Config;
use photo_booth::backends::camera::{
    BackendKind, Camera, CameraEvent, CameraSelector, event_channel,
};
use photo_booth::constants::timing::{CLI_CAPTURE_TIMEOUT, CLI_WARMUP_ATTEMPTS, CLI_WARMUP_DELAY};
use photo_booth::errors::CaptureError;

/// Print the backend this host would use
pub fn detect(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = config.photo_store();
    let selector = CameraSelector::new(store);

    let detected = selector.detect_best_backend();
    let chosen = match config.backend {
        BackendKind::AutoDetect => detected,
        requested => requested,
    };

    println!("Detected backend: {} ({})", detected, CameraSelector::describe(detected));
    if chosen != detected {
        println!("Configured backend: {} ({})", chosen, CameraSelector::describe(chosen));
    }
    println!("Photos directory: {}", selector.store().dir().display());
    Ok(())
}

/// Take one photo and print where it was saved
pub fn take_photo(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(capture_once(config))
}

async fn capture_once(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let selector = CameraSelector::new(config.photo_store());
    let (tx, mut rx) = event_channel();

    let Some(mut camera) = selector.open(config.backend, tx) else {
        return Err("No camera available".into());
    };
    println!("Using camera: {}", CameraSelector::describe(camera.kind()));

    camera.start_preview();

    let mut attempts = 0;
    let result = loop {
        camera.capture_photo();
        println!("Capturing...");

        let event = loop {
            match tokio::time::timeout(CLI_CAPTURE_TIMEOUT, rx.recv()).await {
                Ok(Some(CameraEvent::PreviewStarted | CameraEvent::PreviewStopped)) => continue,
                Ok(Some(event)) => break Ok(event),
                Ok(None) => break Err("Camera closed its event channel".to_string()),
                Err(_) => break Err("Timed out waiting for the photo".to_string()),
            }
        };

        match event {
            Ok(CameraEvent::PhotoReady(asset)) => break Ok(asset),
            // Native devices need a few frames before the first still
            Ok(CameraEvent::CaptureError(CaptureError::NotReady | CaptureError::PreviewNotActive))
                if attempts < CLI_WARMUP_ATTEMPTS =>
            {
                attempts += 1;
                tokio::time::sleep(CLI_WARMUP_DELAY).await;
            }
            Ok(CameraEvent::CaptureError(e)) => break Err(e.to_string()),
            Ok(_) => {}
            Err(e) => break Err(e),
        }
    };

    camera.cleanup();
    camera.settle().await;

    let asset = result?;
    println!("Photo size: {}x{}", asset.width(), asset.height());
    println!("Photo saved: {}", asset.path.display());
    Ok(())
}
