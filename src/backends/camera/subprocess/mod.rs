// SPDX-License-Identifier: GPL-3.0-only

//! Subprocess camera backend for the Raspberry Pi
//!
//! Stills are taken by an external program (`libcamera-still`, falling back
//! to `raspistill`) writing straight to the photos directory. The program has
//! no embeddable preview, so the preview surface is a static placeholder.

pub mod process;

use super::host::HostProbe;
use super::types::*;
use super::{Camera, load_photo_asset};
use crate::constants::storage::SUBPROCESS_PREFIX;
use crate::constants::timing::{PROCESS_KILL_TIMEOUT, PROCESS_START_TIMEOUT};
use crate::errors::CaptureError;
use crate::storage::PhotoStore;
use std::io;
use std::path::{Path, PathBuf};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub use process::{CaptureProcess, ProcessExit, ProcessLauncher, TokioLauncher};

const PREVIEW_TITLE: &str = "Raspberry Pi Camera";

/// Subprocess backend
pub struct SubprocessCamera {
    store: PhotoStore,
    events: EventSender,
    probe: Arc<dyn HostProbe>,
    launcher: Arc<dyn ProcessLauncher>,
    preview: Option<PreviewPublisher>,
    initialized: bool,
    released: bool,
    previewing: bool,
    /// Kill switch of the running capture; closed once the capture task ends
    kill_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SubprocessCamera {
    pub fn new(
        store: PhotoStore,
        events: EventSender,
        probe: Arc<dyn HostProbe>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            store,
            events,
            probe,
            launcher,
            preview: None,
            initialized: false,
            released: false,
            previewing: false,
            kill_tx: None,
            task: None,
        }
    }

    fn capture_in_flight(&self) -> bool {
        self.kill_tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn publish_detail(&self, detail: &str, tone: PreviewTone) {
        if let Some(preview) = &self.preview {
            preview.publish(PreviewContent::placeholder(PREVIEW_TITLE, detail, tone));
        }
    }

    fn emit_error(&self, err: CaptureError) {
        warn!(error = %err, "Subprocess capture rejected");
        let _ = self.events.send(CameraEvent::CaptureError(err));
    }
}

impl Camera for SubprocessCamera {
    fn kind(&self) -> BackendKind {
        BackendKind::Subprocess
    }

    fn initialize(&mut self) -> bool {
        if self.initialized {
            return true;
        }
        if self.released {
            warn!("Subprocess camera was cleaned up and cannot be reused");
            return false;
        }

        info!("Initializing Raspberry Pi camera");

        if !self.probe.is_single_board_computer() {
            warn!("Not running on Raspberry Pi, subprocess camera unavailable");
            return false;
        }

        if let Err(e) = self.store.ensure_exists() {
            error!(error = %e, dir = %self.store.dir().display(), "Photos directory unavailable");
            return false;
        }

        self.preview = Some(PreviewPublisher::new(PreviewContent::placeholder(
            PREVIEW_TITLE,
            "Preview",
            PreviewTone::Idle,
        )));
        self.initialized = true;

        info!("Raspberry Pi camera initialized");
        true
    }

    fn cleanup(&mut self) {
        if !self.initialized {
            self.released = true;
            return;
        }

        debug!("Cleaning up Raspberry Pi camera");
        self.stop_preview();
        // The capture task kills the child and reaps it within PROCESS_KILL_TIMEOUT;
        // settle() waits for that
        self.cancel_capture();
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

        self.previewing = true;
        self.publish_detail("Preview Active", PreviewTone::Live);
        info!("Raspberry Pi camera preview started");
        let _ = self.events.send(CameraEvent::PreviewStarted);
    }

    fn stop_preview(&mut self) {
        if !self.previewing {
            return;
        }

        self.previewing = false;
        self.publish_detail("Preview Stopped", PreviewTone::Idle);
        info!("Raspberry Pi camera preview stopped");
        let _ = self.events.send(CameraEvent::PreviewStopped);
    }

    fn capture_photo(&mut self) {
        if !self.initialized {
            self.emit_error(CaptureError::NotInitialized);
            return;
        }
        if self.capture_in_flight() {
            self.emit_error(CaptureError::InProgress);
            return;
        }

        let path = self.store.asset_path(SUBPROCESS_PREFIX, "jpg");
        info!(path = %path.display(), "Starting Raspberry Pi capture");

        let (kill_tx, kill_rx) = oneshot::channel();
        self.kill_tx = Some(kill_tx);

        let launcher = Arc::clone(&self.launcher);
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            // kill_rx is dropped before the event goes out, so the next
            // capture_photo already sees this capture as finished
            if let Some(event) = run_capture(launcher, path, kill_rx).await {
                let _ = events.send(event);
            }
        }));
    }

    fn cancel_capture(&mut self) {
        if let Some(kill_tx) = self.kill_tx.take()
            && !kill_tx.is_closed()
        {
            info!("Killing capture process");
            let _ = kill_tx.send(());
        }
    }

    fn settle(&mut self) -> BoxFuture<'static, ()> {
        let task = self.task.take();
        Box::pin(async move {
            if let Some(task) = task
                && let Err(e) = task.await
            {
                warn!(error = %e, "Capture task ended abnormally");
            }
        })
    }
}

impl Drop for SubprocessCamera {
    fn drop(&mut self) {
        self.cleanup();
    }
}

enum Outcome {
    Killed,
    Exited(io::Result<ProcessExit>),
}

/// Run one capture; `None` when it was killed
async fn run_capture(
    launcher: Arc<dyn ProcessLauncher>,
    path: PathBuf,
    mut kill: oneshot::Receiver<()>,
) -> Option<CameraEvent> {
    let started = tokio::select! {
        _ = &mut kill => None,
        started = start_process(launcher.as_ref(), &path) => Some(started),
    };
    let Some(started) = started else {
        debug!("Capture cancelled before the program started");
        return None;
    };
    let Some(mut process) = started else {
        error!("Failed to start camera capture process");
        return Some(CameraEvent::CaptureError(CaptureError::ProcessStartFailed));
    };

    let outcome = tokio::select! {
        _ = &mut kill => Outcome::Killed,
        exit = process.wait() => Outcome::Exited(exit),
    };

    let exit = match outcome {
        Outcome::Killed => {
            match timeout(PROCESS_KILL_TIMEOUT, process.kill()).await {
                Ok(Ok(())) => debug!("Capture process killed"),
                Ok(Err(e)) => warn!(error = %e, "Failed to kill capture process"),
                Err(_) => warn!("Capture process did not exit after kill"),
            }
            return None;
        }
        Outcome::Exited(exit) => exit,
    };

    let event = match exit {
        Ok(exit) if exit.success() => match load_photo_asset(path).await {
            Ok(asset) => {
                info!(path = %asset.path.display(), "Photo captured successfully");
                CameraEvent::PhotoReady(asset)
            }
            Err(e) => {
                warn!(error = %e, "Captured photo could not be loaded");
                CameraEvent::CaptureError(e)
            }
        },
        Ok(ProcessExit { code: Some(code) }) => {
            warn!(code, "Capture process failed");
            CameraEvent::CaptureError(CaptureError::ProcessExited { code })
        }
        Ok(ProcessExit { code: None }) => {
            warn!("Capture process terminated by signal");
            CameraEvent::CaptureError(CaptureError::ProcessCrashed)
        }
        Err(e) => {
            warn!(error = %e, "Lost track of capture process");
            CameraEvent::CaptureError(CaptureError::ProcessCrashed)
        }
    };
    Some(event)
}

/// Start the preferred program, falling back to the legacy one once
async fn start_process(
    launcher: &dyn ProcessLauncher,
    output: &Path,
) -> Option<Box<dyn CaptureProcess>> {
    for (program, args) in process::capture_commands(output) {
        debug!(program, args = %args.join(" "), "Launching capture program");
        match timeout(PROCESS_START_TIMEOUT, launcher.launch(program, &args)).await {
            Ok(Ok(process)) => {
                info!(program, "Capture program running");
                return Some(process);
            }
            Ok(Err(e)) => warn!(program, error = %e, "Capture program failed to start"),
            Err(_) => warn!(
                program,
                timeout_ms = PROCESS_START_TIMEOUT.as_millis() as u64,
                "Capture program did not start in time"
            ),
        }
    }
    None
}
