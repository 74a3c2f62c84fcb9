// SPDX-License-Identifier: GPL-3.0-only

//! Capture coordinator
//!
//! Owns the camera, the session record and the one timer of the capture
//! flow. Intents come from the UI; timer expiries and camera events arrive
//! through [`CaptureCoordinator::next_update`] or
//! [`CaptureCoordinator::process_pending`]. Nothing here blocks.
//!
//! ```text
//! Idle ─begin→ Previewing ─request_capture→ CountingDown{N}
//!   CountingDown{k>1} ─tick→ CountingDown{k-1}
//!   CountingDown{1}   ─tick→ Capturing ─500ms→ camera.capture_photo()
//!   Capturing ─photo ready→ Reviewing ─retake→ Previewing
//!                                     ─finish→ Idle
//!   Capturing ─capture error→ Errored ─3s→ Previewing
//!   (any) ─cancel→ Idle
//! ```

use super::catalog::ChoiceCategory;
use super::session::SessionRecord;
use super::state::{CaptureState, CaptureStateKind, CoordinatorUpdate};
use crate::backends::camera::types::*;
use crate::backends::camera::{Camera, CameraSelector};
use crate::constants::timing::{
    CAPTURE_INDICATOR_DELAY, COUNTDOWN_SECONDS, COUNTDOWN_TICK, ERROR_BANNER_DWELL,
};
use crate::errors::CoordinatorError;
use futures::future::BoxFuture;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    CountdownTick,
    CaptureDelay,
    ErrorDwell,
}

enum Wake {
    Event(Option<CameraEvent>),
    Timer,
}

/// Session state machine between the UI and the camera
pub struct CaptureCoordinator {
    camera: Option<Box<dyn Camera>>,
    events: Option<EventReceiver>,
    state: CaptureState,
    session: Option<SessionRecord>,
    timer: Option<(Instant, TimerKind)>,
    countdown_seconds: u32,
}

impl CaptureCoordinator {
    /// Open a camera of `requested` kind, falling back to the simulator
    ///
    /// If the simulator cannot be initialised either, the coordinator is
    /// still usable but every capture intent is rejected.
    pub fn open(selector: &CameraSelector, requested: BackendKind) -> Self {
        let (tx, rx) = event_channel();
        let camera = selector.open(requested, tx);
        Self::with_camera(camera, rx)
    }

    /// Coordinator over an already initialised camera
    pub fn with_camera(camera: Option<Box<dyn Camera>>, events: EventReceiver) -> Self {
        Self {
            events: camera.as_ref().map(|_| events),
            camera,
            state: CaptureState::Idle,
            session: None,
            timer: None,
            countdown_seconds: COUNTDOWN_SECONDS,
        }
    }

    /// Countdown length; values below 1 are clamped to 1
    pub fn with_countdown(mut self, seconds: u32) -> Self {
        self.countdown_seconds = seconds.max(1);
        self
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    /// Kind of the camera in use, `None` when capture is disabled
    pub fn camera_kind(&self) -> Option<BackendKind> {
        self.camera.as_ref().map(|camera| camera.kind())
    }

    pub fn is_capture_enabled(&self) -> bool {
        self.camera.as_ref().is_some_and(|camera| camera.is_available())
    }

    pub fn preview_surface(&self) -> Option<PreviewSurface> {
        self.camera.as_ref().and_then(|camera| camera.preview_surface())
    }

    /// Start a fresh run, replacing any previous session
    pub fn new_session(&mut self) {
        self.session = Some(SessionRecord::new());
    }

    /// Record a choice for the current run
    pub fn choose(&mut self, category: ChoiceCategory, id: &str) -> Result<(), CoordinatorError> {
        self.session
            .get_or_insert_with(SessionRecord::new)
            .set_choice(category, id)
    }

    /// Record the user's name and log the run so far
    pub fn set_user_name(&mut self, name: &str) {
        let session = self.session.get_or_insert_with(SessionRecord::new);
        session.set_user_name(name);
        session.log_summary();
    }

    /// Enter the camera screen: start preview
    pub fn begin(&mut self) -> Result<(), CoordinatorError> {
        if matches!(self.state, CaptureState::Previewing) {
            return Ok(());
        }
        self.expect_state("begin", CaptureStateKind::Idle)?;
        let camera = self.available_camera()?;

        camera.start_preview();
        self.session.get_or_insert_with(SessionRecord::new);
        self.transition(CaptureState::Previewing);
        Ok(())
    }

    /// "Take Photo": start the countdown
    pub fn request_capture(&mut self) -> Result<(), CoordinatorError> {
        self.expect_state("request_capture", CaptureStateKind::Previewing)?;
        self.available_camera()?;

        self.arm(COUNTDOWN_TICK, TimerKind::CountdownTick);
        self.transition(CaptureState::CountingDown {
            remaining: self.countdown_seconds,
        });
        Ok(())
    }

    /// Discard the reviewed photo and preview again
    pub fn retake(&mut self) -> Result<(), CoordinatorError> {
        self.expect_state("retake", CaptureStateKind::Reviewing)?;
        let camera = self.available_camera()?;

        camera.start_preview();
        if let Some(session) = self.session.as_mut() {
            session.set_captured_photo_path(None);
        }
        self.transition(CaptureState::Previewing);
        Ok(())
    }

    /// Accept the reviewed photo and end the run
    pub fn finish(&mut self) -> Result<(), CoordinatorError> {
        self.expect_state("finish", CaptureStateKind::Reviewing)?;

        if let Some(camera) = self.camera.as_mut() {
            camera.stop_preview();
        }
        self.session = None;
        self.transition(CaptureState::Idle);
        Ok(())
    }

    /// Abandon the run from any state
    pub fn cancel(&mut self) {
        if let Some(camera) = self.camera.as_mut() {
            camera.cancel_capture();
            camera.stop_preview();
        }
        self.timer = None;
        self.session = None;
        self.transition(CaptureState::Idle);
    }

    /// Cancel the run and release the camera
    pub fn shutdown(&mut self) {
        drop(self.release_camera());
    }

    /// Like [`Self::shutdown`], but waits for the camera's background work
    pub async fn close(&mut self) {
        if let Some(settled) = self.release_camera() {
            settled.await;
            debug!("Camera settled");
        }
    }

    fn release_camera(&mut self) -> Option<BoxFuture<'static, ()>> {
        self.cancel();
        self.events = None;
        let mut camera = self.camera.take()?;
        info!(backend = %camera.kind(), "Releasing camera");
        camera.cleanup();
        Some(camera.settle())
    }

    /// Wait for the next timer expiry or camera event that changes something
    ///
    /// Never resolves while there is nothing left to wait for.
    pub async fn next_update(&mut self) -> CoordinatorUpdate {
        loop {
            let deadline = self.timer.map(|(at, _)| at);

            let wake = tokio::select! {
                biased;
                event = recv_event(&mut self.events) => Wake::Event(event),
                _ = sleep_until(deadline) => Wake::Timer,
            };

            let update = match wake {
                Wake::Event(Some(event)) => self.handle_event(event),
                Wake::Event(None) => {
                    debug!("Camera event channel closed");
                    self.events = None;
                    None
                }
                Wake::Timer => self.fire_timer(),
            };

            if let Some(update) = update {
                return update;
            }
        }
    }

    /// Apply everything that is already due, without waiting
    pub fn process_pending(&mut self) -> Vec<CoordinatorUpdate> {
        let mut updates = Vec::new();

        while let Some(event) = self.events.as_mut().and_then(|rx| rx.try_recv().ok()) {
            updates.extend(self.handle_event(event));
        }

        while self
            .timer
            .is_some_and(|(deadline, _)| deadline <= Instant::now())
        {
            updates.extend(self.fire_timer());
        }

        updates
    }

    fn expect_state(
        &self,
        intent: &'static str,
        expected: CaptureStateKind,
    ) -> Result<(), CoordinatorError> {
        let state = self.state.kind();
        if state == expected {
            Ok(())
        } else {
            debug!(intent, %state, "Intent rejected");
            Err(CoordinatorError::InvalidIntent { intent, state })
        }
    }

    fn available_camera(&mut self) -> Result<&mut Box<dyn Camera>, CoordinatorError> {
        match self.camera.as_mut() {
            Some(camera) if camera.is_available() => Ok(camera),
            _ => Err(CoordinatorError::CameraUnavailable),
        }
    }

    fn transition(&mut self, next: CaptureState) {
        debug!(from = %self.state.kind(), to = %next.kind(), "Capture state");
        self.state = next;
    }

    fn arm(&mut self, after: std::time::Duration, kind: TimerKind) {
        self.timer = Some((Instant::now() + after, kind));
    }

    fn fire_timer(&mut self) -> Option<CoordinatorUpdate> {
        let (deadline, kind) = self.timer.take()?;

        match (kind, self.state.kind()) {
            (TimerKind::CountdownTick, CaptureStateKind::CountingDown) => {
                let CaptureState::CountingDown { remaining } = self.state else {
                    return None;
                };
                if remaining > 1 {
                    // Periodic: schedule from the previous deadline, not from now
                    self.timer = Some((deadline + COUNTDOWN_TICK, TimerKind::CountdownTick));
                    self.transition(CaptureState::CountingDown {
                        remaining: remaining - 1,
                    });
                    Some(CoordinatorUpdate::Countdown(remaining - 1))
                } else {
                    self.arm(CAPTURE_INDICATOR_DELAY, TimerKind::CaptureDelay);
                    self.transition(CaptureState::Capturing);
                    Some(CoordinatorUpdate::CaptureIndicator)
                }
            }
            (TimerKind::CaptureDelay, CaptureStateKind::Capturing) => {
                let camera = self.camera.as_mut()?;
                info!(backend = %camera.kind(), "Triggering capture");
                camera.capture_photo();
                Some(CoordinatorUpdate::CaptureStarted)
            }
            (TimerKind::ErrorDwell, CaptureStateKind::Errored) => {
                if let Some(camera) = self.camera.as_mut() {
                    camera.start_preview();
                }
                self.transition(CaptureState::Previewing);
                Some(CoordinatorUpdate::Recovered)
            }
            (kind, state) => {
                debug!(?kind, %state, "Stale timer ignored");
                None
            }
        }
    }

    fn handle_event(&mut self, event: CameraEvent) -> Option<CoordinatorUpdate> {
        match event {
            CameraEvent::PhotoReady(asset) => {
                if !matches!(self.state, CaptureState::Capturing) {
                    debug!(state = %self.state.kind(), path = %asset.path.display(), "Late photo ignored");
                    return None;
                }

                info!(path = %asset.path.display(), "Photo ready");
                if let Some(session) = self.session.as_mut() {
                    session.set_captured_photo_path(Some(asset.path.clone()));
                }
                if let Some(camera) = self.camera.as_mut() {
                    camera.stop_preview();
                }
                self.transition(CaptureState::Reviewing {
                    photo: asset.clone(),
                });
                Some(CoordinatorUpdate::PhotoReady(asset))
            }
            CameraEvent::CaptureError(err) => {
                if !matches!(self.state, CaptureState::Capturing) {
                    debug!(state = %self.state.kind(), error = %err, "Late capture error ignored");
                    return None;
                }

                warn!(error = %err, category = err.category(), "Capture failed");
                let message = err.to_string();
                self.arm(ERROR_BANNER_DWELL, TimerKind::ErrorDwell);
                self.transition(CaptureState::Errored {
                    message: message.clone(),
                });
                Some(CoordinatorUpdate::CaptureFailed(message))
            }
            CameraEvent::PreviewStarted => Some(CoordinatorUpdate::PreviewStarted),
            CameraEvent::PreviewStopped => Some(CoordinatorUpdate::PreviewStopped),
        }
    }
}

impl Drop for CaptureCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn recv_event(events: &mut Option<EventReceiver>) -> Option<CameraEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
