// SPDX-License-Identifier: GPL-3.0-only

//! Simulator camera backend
//!
//! Stands in for real hardware on development hosts and when no camera is
//! reachable. Captures take one simulated second and produce a synthetic
//! 800×600 PNG.

pub mod test_pattern;

use super::types::*;
use super::{Camera, load_photo_asset};
use crate::constants::simulator::STAMP_FORMAT;
use crate::constants::storage::SIMULATOR_PREFIX;
use crate::constants::timing::SIMULATOR_CAPTURE_DELAY;
use crate::errors::CaptureError;
use crate::storage::PhotoStore;
use image::ImageFormat;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const PREVIEW_TITLE: &str = "📷 Mock Camera Preview";
const LIVE_TITLE: &str = "📷 Mock Camera - Live Preview";

/// Simulator backend
pub struct SimulatorCamera {
    store: PhotoStore,
    events: EventSender,
    preview: Option<PreviewPublisher>,
    initialized: bool,
    released: bool,
    previewing: bool,
    /// Serializes overlapping captures in request order
    capture_lock: Arc<Mutex<()>>,
    in_flight: Vec<JoinHandle<()>>,
}

impl SimulatorCamera {
    pub fn new(store: PhotoStore, events: EventSender) -> Self {
        Self {
            store,
            events,
            preview: None,
            initialized: false,
            released: false,
            previewing: false,
            capture_lock: Arc::new(Mutex::new(())),
            in_flight: Vec::new(),
        }
    }

    fn publish(&self, content: PreviewContent) {
        if let Some(preview) = &self.preview {
            preview.publish(content);
        }
    }

    fn resting_content(previewing: bool) -> PreviewContent {
        if previewing {
            PreviewContent::placeholder(LIVE_TITLE, "Ready to take photo!", PreviewTone::Live)
        } else {
            PreviewContent::placeholder(PREVIEW_TITLE, "Preview stopped", PreviewTone::Idle)
        }
    }

    fn abort_in_flight(&mut self) {
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }
}

impl Camera for SimulatorCamera {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulator
    }

    fn initialize(&mut self) -> bool {
        if self.initialized {
            return true;
        }
        if self.released {
            warn!("Simulator camera was cleaned up and cannot be reused");
            return false;
        }

        info!("Initializing simulator camera");

        if let Err(e) = self.store.ensure_exists() {
            warn!(error = %e, dir = %self.store.dir().display(), "Photos directory unavailable");
            return false;
        }

        self.preview = Some(PreviewPublisher::new(PreviewContent::placeholder(
            PREVIEW_TITLE,
            "Click 'Take Photo' to capture a test image",
            PreviewTone::Idle,
        )));
        self.initialized = true;

        debug!("Simulator camera initialization complete");
        true
    }

    fn cleanup(&mut self) {
        if !self.initialized {
            self.released = true;
            return;
        }

        debug!("Cleaning up simulator camera");
        self.stop_preview();
        self.abort_in_flight();
        self.preview = None;
        self.initialized = false;
        self.released = true;
    }

    fn is_available(&self) -> bool {
        self.initialized
    }

    fn preview_surface(&self) -> Option<PreviewSurface> {
        self.preview.as_ref().map(PreviewPublisher::surface)
    }

    fn start_preview(&mut self) {
        if !self.initialized || self.previewing {
            return;
        }

        debug!("Simulator preview started");
        self.previewing = true;
        self.publish(Self::resting_content(true));
        let _ = self.events.send(CameraEvent::PreviewStarted);
    }

    fn stop_preview(&mut self) {
        if !self.previewing {
            return;
        }

        debug!("Simulator preview stopped");
        self.previewing = false;
        self.publish(Self::resting_content(false));
        let _ = self.events.send(CameraEvent::PreviewStopped);
    }

    fn capture_photo(&mut self) {
        if !self.initialized {
            let _ = self.events.send(CameraEvent::CaptureError(CaptureError::NotInitialized));
            return;
        }

        self.in_flight.retain(|handle| !handle.is_finished());
        if !self.in_flight.is_empty() {
            debug!(queued = self.in_flight.len(), "Simulator capture queued behind running capture");
        }

        info!("Starting simulated photo capture");
        self.publish(PreviewContent::placeholder(
            "📸 Capturing...",
            "",
            PreviewTone::Capturing,
        ));

        let Some(preview) = self.preview.as_ref().map(PreviewPublisher::sender) else {
            return;
        };
        let task = CaptureTask {
            store: self.store.clone(),
            events: self.events.clone(),
            preview,
            resting: Self::resting_content(self.previewing),
        };
        let lock = Arc::clone(&self.capture_lock);

        self.in_flight.push(tokio::spawn(async move {
            let _serialized = lock.lock().await;
            tokio::time::sleep(SIMULATOR_CAPTURE_DELAY).await;
            task.complete().await;
        }));
    }

    fn cancel_capture(&mut self) {
        if self.in_flight.iter().any(|handle| !handle.is_finished()) {
            debug!("Cancelling simulated capture");
            self.publish(Self::resting_content(self.previewing));
        }
        self.abort_in_flight();
    }
}

impl Drop for SimulatorCamera {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Work done when the simulated exposure elapses
struct CaptureTask {
    store: PhotoStore,
    events: EventSender,
    preview: watch::Sender<PreviewContent>,
    resting: PreviewContent,
}

impl CaptureTask {
    async fn complete(self) {
        let now = chrono::Local::now();
        let image = test_pattern::render(&now.format(STAMP_FORMAT).to_string());
        let path = self.store.asset_path_at(SIMULATOR_PREFIX, "png", now);

        let saved = self
            .store
            .ensure_exists()
            .map_err(|e| e.to_string())
            .and_then(|_| {
                image
                    .save_with_format(&path, ImageFormat::Png)
                    .map_err(|e| e.to_string())
            });

        self.preview.send_replace(self.resting);

        let event = match saved {
            Ok(()) => {
                info!(path = %path.display(), "Mock photo saved");
                match load_photo_asset(path).await {
                    Ok(asset) => CameraEvent::PhotoReady(asset),
                    Err(e) => CameraEvent::CaptureError(e),
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to save mock photo");
                CameraEvent::CaptureError(CaptureError::SaveFailed(
                    "Failed to save mock photo".to_string(),
                ))
            }
        };
        let _ = self.events.send(event);
    }
}
