// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! Every backend implements the same small capability: lifecycle, a preview
//! surface, and asynchronous still capture. Results travel back on the
//! camera's event channel instead of return values, so callers never block.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ CaptureCoordinator  │  ← countdown, state machine, session record
//! └──────────┬──────────┘
//!            │ Box<dyn Camera>      ▲ CameraEvent channel
//!            ▼                      │
//! ┌─────────────────────┐           │
//! │   CameraSelector    │  ← platform detection via HostProbe
//! └──────────┬──────────┘           │
//!            ▼                      │
//!   ┌─────────────┬─────────────┬─────────────┐
//!   │   Native    │ Subprocess  │  Simulator  │
//!   │ (GStreamer) │ (libcamera) │(test image) │
//!   └─────────────┴─────────────┴─────────────┘
//! ```

pub mod host;
pub mod native;
pub mod selector;
pub mod simulator;
pub mod subprocess;
pub mod types;

use futures::future::BoxFuture;

pub use host::{HostProbe, SystemProbe};
pub use selector::CameraSelector;
pub use types::*;

/// Camera capability implemented by every backend
///
/// Lifecycle: `constructed → initialized → previewing ↔ idle → cleaned-up`.
/// None of these methods may block the caller for more than a few
/// milliseconds; capture results arrive later as [`CameraEvent`]s.
pub trait Camera: Send {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Acquire the device or tool
    ///
    /// Idempotent. Returns `false` without side effects when prerequisites
    /// are missing (no device, missing tool, wrong platform, permission).
    fn initialize(&mut self) -> bool;

    /// Stop preview and any capture, release handles
    ///
    /// Idempotent and safe to call from `Drop`. The instance is unusable
    /// afterwards.
    fn cleanup(&mut self);

    /// True while initialized and the device or tool is still reachable
    fn is_available(&self) -> bool;

    /// Handle the UI embeds to show preview content
    ///
    /// `None` before initialization; the same surface for the rest of the
    /// instance's life afterwards.
    fn preview_surface(&self) -> Option<PreviewSurface>;

    /// Emits `PreviewStarted` on the transition only
    fn start_preview(&mut self);

    /// Emits `PreviewStopped` on the transition only
    fn stop_preview(&mut self);

    /// Begin an asynchronous capture
    ///
    /// Exactly one of `PhotoReady` or `CaptureError` follows, unless
    /// [`Camera::cancel_capture`] is called first.
    fn capture_photo(&mut self);

    /// Best-effort cancellation; no event is emitted for the cancelled request
    fn cancel_capture(&mut self);

    /// Resolves once background work left behind by `cleanup` has finished
    fn settle(&mut self) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

/// Load a saved photo back from disk
///
/// Shared by every backend so the bitmap in `PhotoReady` is always the file
/// content. Decoding runs on the blocking pool.
pub(crate) async fn load_photo_asset(
    path: std::path::PathBuf,
) -> Result<PhotoAsset, crate::errors::CaptureError> {
    use crate::errors::CaptureError;

    tokio::task::spawn_blocking(move || decode_photo(path))
        .await
        .map_err(|e| CaptureError::DecodeFailed(format!("Decode task error: {}", e)))?
}

fn decode_photo(path: std::path::PathBuf) -> Result<PhotoAsset, crate::errors::CaptureError> {
    use crate::errors::CaptureError;

    if !path.is_file() {
        return Err(CaptureError::DecodeFailed(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let image = image::open(&path)
        .map_err(|e| CaptureError::DecodeFailed(e.to_string()))?
        .to_rgba8();

    if image.width() == 0 || image.height() == 0 {
        return Err(CaptureError::DecodeFailed(format!(
            "{} is empty",
            path.display()
        )));
    }

    Ok(PhotoAsset {
        image: std::sync::Arc::new(image),
        path,
    })
}
