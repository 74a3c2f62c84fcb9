// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend selection
//!
//! Detection order:
//! 1. development host (macOS build): always the simulator
//! 2. Raspberry Pi: the subprocess backend
//! 3. GStreamer available: the native backend
//! 4. otherwise the simulator
//!
//! [`CameraSelector::create`] only constructs; [`CameraSelector::open`] also
//! initialises and falls back to the simulator once.

use super::host::{HostProbe, SystemProbe};
use super::native::{GstFramework, MediaFramework, NativeCamera};
use super::simulator::SimulatorCamera;
use super::subprocess::{ProcessLauncher, SubprocessCamera, TokioLauncher};
use super::types::*;
use super::Camera;
use crate::storage::PhotoStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Chooses and constructs camera backends
#[derive(Clone)]
pub struct CameraSelector {
    probe: Arc<dyn HostProbe>,
    store: PhotoStore,
    launcher: Arc<dyn ProcessLauncher>,
    framework: Arc<dyn MediaFramework>,
    dev_host_override: bool,
}

impl CameraSelector {
    /// Selector for the running system
    pub fn new(store: PhotoStore) -> Self {
        Self {
            probe: Arc::new(SystemProbe::new()),
            store,
            launcher: Arc::new(TokioLauncher),
            framework: Arc::new(GstFramework),
            dev_host_override: cfg!(target_os = "macos"),
        }
    }

    /// Replace the host probe
    pub fn with_probe(mut self, probe: Arc<dyn HostProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the process launcher used by the subprocess backend
    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Replace the media framework used by the native backend
    pub fn with_framework(mut self, framework: Arc<dyn MediaFramework>) -> Self {
        self.framework = framework;
        self
    }

    /// Force (or lift) the development-host simulator override
    pub fn with_dev_host_override(mut self, enabled: bool) -> Self {
        self.dev_host_override = enabled;
        self
    }

    pub fn store(&self) -> &PhotoStore {
        &self.store
    }

    /// Best backend for this host
    pub fn detect_best_backend(&self) -> BackendKind {
        let kind = if self.dev_host_override {
            BackendKind::Simulator
        } else if self.probe.is_single_board_computer() {
            BackendKind::Subprocess
        } else if self.probe.native_framework_available() {
            BackendKind::Native
        } else {
            BackendKind::Simulator
        };

        info!(backend = %kind, "Detected camera backend");
        kind
    }

    /// Construct a camera of `kind`, resolving `AutoDetect` first
    ///
    /// On the development host every request yields the simulator.
    pub fn create(&self, kind: BackendKind, events: EventSender) -> Box<dyn Camera> {
        let kind = match kind {
            _ if self.dev_host_override => BackendKind::Simulator,
            BackendKind::AutoDetect => self.detect_best_backend(),
            other => other,
        };

        info!(backend = %kind, description = Self::describe(kind), "Creating camera");

        match kind {
            BackendKind::Native => Box::new(NativeCamera::new(
                self.store.clone(),
                events,
                Arc::clone(&self.framework),
            )),
            BackendKind::Subprocess => Box::new(SubprocessCamera::new(
                self.store.clone(),
                events,
                Arc::clone(&self.probe),
                Arc::clone(&self.launcher),
            )),
            BackendKind::Simulator | BackendKind::AutoDetect => {
                Box::new(SimulatorCamera::new(self.store.clone(), events))
            }
        }
    }

    /// Create and initialise a camera, falling back to the simulator
    ///
    /// `None` when not even the simulator initialises; capture is then
    /// disabled.
    pub fn open(&self, requested: BackendKind, events: EventSender) -> Option<Box<dyn Camera>> {
        let mut camera = self.create(requested, events.clone());
        if camera.initialize() {
            info!(backend = %camera.kind(), "Camera ready");
            return Some(camera);
        }

        let failed = camera.kind();
        warn!(backend = %failed, "Camera initialization failed");
        camera.cleanup();
        drop(camera);

        if failed != BackendKind::Simulator {
            let mut fallback = self.create(BackendKind::Simulator, events);
            if fallback.initialize() {
                info!("Falling back to simulator camera");
                return Some(fallback);
            }
        }

        warn!("No camera available, capture disabled");
        None
    }

    /// Human-readable backend name
    pub fn describe(kind: BackendKind) -> &'static str {
        match kind {
            BackendKind::Native => "Native Camera (GStreamer)",
            BackendKind::Subprocess => "Raspberry Pi Camera",
            BackendKind::Simulator => "Simulator Camera",
            BackendKind::AutoDetect => "Auto Detect",
        }
    }
}

impl std::fmt::Debug for CameraSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSelector")
            .field("store", &self.store)
            .field("dev_host_override", &self.dev_host_override)
            .finish()
    }
}
