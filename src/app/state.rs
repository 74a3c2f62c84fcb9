// SPDX-License-Identifier: GPL-3.0-only

//! Capture state machine types

use crate::backends::camera::types::PhotoAsset;
use std::fmt;

/// Capture session state
///
/// Transitions are driven exclusively by [`super::CaptureCoordinator`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CaptureState {
    /// No run in progress on the camera screen
    #[default]
    Idle,
    /// Live (or placeholder) preview shown, waiting for "Take Photo"
    Previewing,
    /// Countdown visible; `remaining` is the number on screen
    CountingDown { remaining: u32 },
    /// Capture indicator shown, shutter pending or in flight
    Capturing,
    /// Captured photo on screen with Retake / Continue
    Reviewing { photo: PhotoAsset },
    /// Error banner on screen, preview resumes after the dwell
    Errored { message: String },
}

/// Discriminant of [`CaptureState`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureStateKind {
    Idle,
    Previewing,
    CountingDown,
    Capturing,
    Reviewing,
    Errored,
}

impl CaptureState {
    pub fn kind(&self) -> CaptureStateKind {
        match self {
            CaptureState::Idle => CaptureStateKind::Idle,
            CaptureState::Previewing => CaptureStateKind::Previewing,
            CaptureState::CountingDown { .. } => CaptureStateKind::CountingDown,
            CaptureState::Capturing => CaptureStateKind::Capturing,
            CaptureState::Reviewing { .. } => CaptureStateKind::Reviewing,
            CaptureState::Errored { .. } => CaptureStateKind::Errored,
        }
    }

    /// Text of the centred overlay, if any
    pub fn overlay_text(&self) -> Option<String> {
        match self {
            CaptureState::CountingDown { remaining } => Some(remaining.to_string()),
            CaptureState::Capturing => Some("📸".to_string()),
            CaptureState::Errored { .. } => Some("Error!".to_string()),
            _ => None,
        }
    }

    /// Photo under review
    pub fn photo(&self) -> Option<&PhotoAsset> {
        match self {
            CaptureState::Reviewing { photo } => Some(photo),
            _ => None,
        }
    }

    /// Retake and Continue are only offered while reviewing
    pub fn shows_review_actions(&self) -> bool {
        matches!(self, CaptureState::Reviewing { .. })
    }

    /// Take Photo is only offered while previewing
    pub fn accepts_capture(&self) -> bool {
        matches!(self, CaptureState::Previewing)
    }
}

impl fmt::Display for CaptureStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureStateKind::Idle => "idle",
            CaptureStateKind::Previewing => "previewing",
            CaptureStateKind::CountingDown => "counting down",
            CaptureStateKind::Capturing => "capturing",
            CaptureStateKind::Reviewing => "reviewing",
            CaptureStateKind::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// What changed after the coordinator handled a timer or camera event
#[derive(Debug, Clone)]
pub enum CoordinatorUpdate {
    /// Countdown advanced to this number
    Countdown(u32),
    /// Countdown finished; capture indicator is up
    CaptureIndicator,
    /// The shutter request went to the camera
    CaptureStarted,
    /// Capture succeeded; now reviewing
    PhotoReady(PhotoAsset),
    /// Capture failed; error banner is up
    CaptureFailed(String),
    /// Error banner dwell elapsed; previewing again
    Recovered,
    PreviewStarted,
    PreviewStopped,
}
