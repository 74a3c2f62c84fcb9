// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::errors::CaptureError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Camera backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Pick a backend from the running platform
    #[default]
    AutoDetect,
    /// GStreamer-driven camera device
    Native,
    /// External still-capture program on a Raspberry Pi
    Subprocess,
    /// In-process simulator producing test images
    Simulator,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::AutoDetect,
        BackendKind::Native,
        BackendKind::Subprocess,
        BackendKind::Simulator,
    ];

    /// Parse the command-line spelling of a backend
    pub fn from_arg(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" | "auto-detect" | "autodetect" => Some(BackendKind::AutoDetect),
            "native" | "gstreamer" => Some(BackendKind::Native),
            "subprocess" | "pi" | "libcamera" => Some(BackendKind::Subprocess),
            "simulator" | "mock" | "sim" => Some(BackendKind::Simulator),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::AutoDetect => write!(f, "auto"),
            BackendKind::Native => write!(f, "native"),
            BackendKind::Subprocess => write!(f, "subprocess"),
            BackendKind::Simulator => write!(f, "simulator"),
        }
    }
}

/// A captured photo: the decoded bitmap and the file it was read from
///
/// The bitmap is always the content of `path`; backends load it back from
/// disk before emitting, so the file exists when the event is delivered.
#[derive(Clone)]
pub struct PhotoAsset {
    pub image: Arc<RgbaImage>,
    pub path: PathBuf,
}

impl PhotoAsset {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl PartialEq for PhotoAsset {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && (Arc::ptr_eq(&self.image, &other.image) || self.image == other.image)
    }
}

impl std::fmt::Debug for PhotoAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoAsset")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("path", &self.path)
            .finish()
    }
}

/// Outbound camera events
#[derive(Debug, Clone)]
pub enum CameraEvent {
    PhotoReady(PhotoAsset),
    CaptureError(CaptureError),
    PreviewStarted,
    PreviewStopped,
}

/// Producer half of a camera's event channel
pub type EventSender = mpsc::UnboundedSender<CameraEvent>;

/// Consumer half of a camera's event channel
pub type EventReceiver = mpsc::UnboundedReceiver<CameraEvent>;

/// Create an event channel for one camera instance
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Visual mood of a placeholder preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTone {
    Idle,
    Live,
    Capturing,
}

/// What a preview surface currently shows
#[derive(Clone)]
pub enum PreviewContent {
    /// No live video, only text feedback
    Placeholder {
        title: String,
        detail: String,
        tone: PreviewTone,
    },
    /// Latest live frame
    Frame(Arc<RgbaImage>),
}

impl PreviewContent {
    pub fn placeholder(title: &str, detail: &str, tone: PreviewTone) -> Self {
        PreviewContent::Placeholder {
            title: title.to_string(),
            detail: detail.to_string(),
            tone,
        }
    }
}

impl std::fmt::Debug for PreviewContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviewContent::Placeholder {
                title,
                detail,
                tone,
            } => write!(f, "Placeholder({:?}, {:?}, {:?})", title, detail, tone),
            PreviewContent::Frame(frame) => {
                write!(f, "Frame({}x{})", frame.width(), frame.height())
            }
        }
    }
}

/// Opaque display handle the UI embeds to show preview content
///
/// The camera keeps the producer side; clones of this handle only observe.
#[derive(Clone, Debug)]
pub struct PreviewSurface {
    receiver: watch::Receiver<PreviewContent>,
}

impl PreviewSurface {
    /// Current content, marking it as seen
    pub fn current(&mut self) -> PreviewContent {
        self.receiver.borrow_and_update().clone()
    }

    /// Current content without touching the change marker
    pub fn peek(&self) -> PreviewContent {
        self.receiver.borrow().clone()
    }

    /// True if the content changed since the last `current()`
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// True once the owning camera has released the surface
    pub fn is_released(&self) -> bool {
        self.receiver.has_changed().is_err()
    }
}

/// Producer side of a preview surface, owned by a camera
#[derive(Debug)]
pub struct PreviewPublisher {
    sender: watch::Sender<PreviewContent>,
}

impl PreviewPublisher {
    pub fn new(initial: PreviewContent) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn surface(&self) -> PreviewSurface {
        PreviewSurface {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn publish(&self, content: PreviewContent) {
        // send_replace never fails, even without subscribers
        self.sender.send_replace(content);
    }

    /// Cloneable handle for producers living on other threads
    pub fn sender(&self) -> watch::Sender<PreviewContent> {
        self.sender.clone()
    }
}

/// Result type for backend-internal operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend-internal failures
///
/// These never cross the camera contract; `initialize` maps them to `false`
/// and capture paths map them to a `CaptureError` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Access to the device was refused
    PermissionDenied(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(err.to_string()),
            _ => BackendError::IoError(err.to_string()),
        }
    }
}

impl From<BackendError> for CaptureError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PermissionDenied(msg) => CaptureError::PermissionDenied(msg),
            BackendError::NotAvailable(msg) | BackendError::DeviceNotFound(msg) => {
                CaptureError::Unavailable(msg)
            }
            BackendError::IoError(msg) => CaptureError::SaveFailed(msg),
            BackendError::InitializationFailed(msg) | BackendError::Other(msg) => {
                CaptureError::Device(msg)
            }
        }
    }
}
