// SPDX-License-Identifier: GPL-3.0-only

//! Native camera backend
//!
//! Drives a real camera through the host media framework (GStreamer). The
//! framework sits behind [`MediaFramework`] / [`MediaSession`] so the capture
//! flow can be exercised without a device.
//!
//! Capture flow:
//! 1. grab a still from the running session (logged with its dimensions)
//! 2. encode it as JPEG on the blocking pool and write `photo_<ts>.jpg`
//! 3. load the saved file back and emit `PhotoReady`
//!
//! The file on disk is authoritative; the grabbed frame is never emitted
//! directly.

pub mod pipeline;

use super::types::*;
use super::{Camera, load_photo_asset};
use crate::constants::native::JPEG_QUALITY;
use crate::constants::storage::NATIVE_PREFIX;
use crate::errors::CaptureError;
use crate::storage::PhotoStore;
use futures::future::BoxFuture;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use pipeline::GstFramework;

/// A video input device offered by the media framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInput {
    /// Position in the framework's device list
    pub index: usize,
    pub name: String,
}

/// Host media framework
pub trait MediaFramework: Send + Sync {
    /// Enumerate video input devices
    fn video_inputs(&self) -> BackendResult<Vec<VideoInput>>;

    /// Bind `input` into a running session publishing preview frames to `preview`
    ///
    /// The returned session is already active (device warmed up).
    fn open(
        &self,
        input: &VideoInput,
        preview: watch::Sender<PreviewContent>,
    ) -> BackendResult<Box<dyn MediaSession>>;
}

/// Capture session bound to one device
pub trait MediaSession: Send {
    /// Start or stop the device
    fn set_active(&mut self, active: bool) -> BackendResult<()>;

    fn is_active(&self) -> bool;

    /// True once the session can deliver a still
    fn is_ready_for_capture(&self) -> bool;

    /// Grab one full-resolution still
    fn grab_still(&self) -> BoxFuture<'static, BackendResult<RgbaImage>>;

    /// Stop the device and release its handles
    fn close(&mut self);
}

/// True if GStreamer is usable on this host
pub fn gstreamer_available() -> bool {
    pipeline::available()
}

/// Native backend
pub struct NativeCamera {
    store: PhotoStore,
    events: EventSender,
    framework: Arc<dyn MediaFramework>,
    session: Option<Box<dyn MediaSession>>,
    preview: Option<PreviewPublisher>,
    busy: Arc<AtomicBool>,
    capture: Option<JoinHandle<()>>,
    released: bool,
}

impl NativeCamera {
    pub fn new(store: PhotoStore, events: EventSender, framework: Arc<dyn MediaFramework>) -> Self {
        Self {
            store,
            events,
            framework,
            session: None,
            preview: None,
            busy: Arc::new(AtomicBool::new(false)),
            capture: None,
            released: false,
        }
    }

    fn emit_error(&self, err: CaptureError) {
        warn!(error = %err, category = err.category(), "Native capture rejected");
        let _ = self.events.send(CameraEvent::CaptureError(err));
    }

    fn open_session(&mut self) -> BackendResult<()> {
        let inputs = self.framework.video_inputs()?;
        let Some(input) = inputs.first() else {
            return Err(BackendError::DeviceNotFound(
                "No video input devices".to_string(),
            ));
        };
        info!(device = %input.name, available = inputs.len(), "Using default video input");

        self.store.ensure_exists()?;

        let preview = PreviewPublisher::new(PreviewContent::placeholder(
            &input.name,
            "Starting camera...",
            PreviewTone::Idle,
        ));
        let session = self.framework.open(input, preview.sender())?;

        self.preview = Some(preview);
        self.session = Some(session);
        Ok(())
    }
}

impl Camera for NativeCamera {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn initialize(&mut self) -> bool {
        if self.session.is_some() {
            return true;
        }
        if self.released {
            warn!("Native camera was cleaned up and cannot be reused");
            return false;
        }

        info!("Initializing native camera");
        match self.open_session() {
            Ok(()) => {
                info!("Native camera initialization complete");
                true
            }
            Err(e) => {
                error!(error = %e, "Native camera initialization failed");
                self.session = None;
                self.preview = None;
                false
            }
        }
    }

    fn cleanup(&mut self) {
        if self.session.is_none() {
            self.released = true;
            return;
        }

        debug!("Cleaning up native camera");
        self.cancel_capture();
        self.stop_preview();
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.preview = None;
        self.released = true;
    }

    fn is_available(&self) -> bool {
        self.session.is_some()
    }

    fn preview_surface(&self) -> Option<PreviewSurface> {
        self.preview.as_ref().map(PreviewPublisher::surface)
    }

    fn start_preview(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.is_active() {
            return;
        }

        match session.set_active(true) {
            Ok(()) => {
                debug!("Native preview started");
                let _ = self.events.send(CameraEvent::PreviewStarted);
            }
            Err(e) => warn!(error = %e, "Failed to start native preview"),
        }
    }

    fn stop_preview(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.is_active() {
            return;
        }

        match session.set_active(false) {
            Ok(()) => {
                debug!("Native preview stopped");
                let _ = self.events.send(CameraEvent::PreviewStopped);
            }
            Err(e) => warn!(error = %e, "Failed to stop native preview"),
        }
    }

    fn capture_photo(&mut self) {
        let Some(session) = self.session.as_ref() else {
            self.emit_error(CaptureError::NotInitialized);
            return;
        };
        if !session.is_active() {
            self.emit_error(CaptureError::PreviewNotActive);
            return;
        }
        if !session.is_ready_for_capture() {
            self.emit_error(CaptureError::NotReady);
            return;
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            self.emit_error(CaptureError::InProgress);
            return;
        }

        let path = self.store.asset_path(NATIVE_PREFIX, "jpg");
        info!(path = %path.display(), "Starting native capture");

        let still = session.grab_still();
        let busy = Arc::clone(&self.busy);
        let events = self.events.clone();

        self.capture = Some(tokio::spawn(async move {
            let result = run_capture(still, path).await;
            busy.store(false, Ordering::SeqCst);

            let event = match result {
                Ok(asset) => CameraEvent::PhotoReady(asset),
                Err(e) => {
                    warn!(error = %e, "Native capture failed");
                    CameraEvent::CaptureError(e)
                }
            };
            let _ = events.send(event);
        }));
    }

    fn cancel_capture(&mut self) {
        if let Some(handle) = self.capture.take()
            && !handle.is_finished()
        {
            debug!("Cancelling native capture");
            handle.abort();
        }
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl Drop for NativeCamera {
    fn drop(&mut self) {
        self.cleanup();
    }
}

async fn run_capture(
    still: BoxFuture<'static, BackendResult<RgbaImage>>,
    path: PathBuf,
) -> Result<PhotoAsset, CaptureError> {
    let image = still.await.map_err(CaptureError::from)?;
    info!(width = image.width(), height = image.height(), "Image captured");

    let save_path = path.clone();
    tokio::task::spawn_blocking(move || save_jpeg(&image, &save_path))
        .await
        .map_err(|e| CaptureError::SaveFailed(format!("Save task error: {}", e)))??;
    info!(path = %path.display(), "Image saved");

    load_photo_asset(path).await
}

/// Encode as JPEG (alpha dropped) and write to `path`
fn save_jpeg(image: &RgbaImage, path: &Path) -> Result<(), CaptureError> {
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();

    let mut buffer = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| CaptureError::SaveFailed(format!("JPEG encoding failed: {}", e)))?;

    std::fs::write(path, &buffer).map_err(|e| {
        CaptureError::SaveFailed(format!("Failed to save photo: {}", e))
    })
}
