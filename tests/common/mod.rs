// SPDX-License-Identifier: GPL-3.0-only

//! Test doubles for the injectable seams: host probe, process launcher,
//! media framework and camera.

#![allow(dead_code)]

use futures::future::BoxFuture;
use image::RgbaImage;
use photo_booth::backends::camera::native::{MediaFramework, MediaSession, VideoInput};
use photo_booth::backends::camera::subprocess::{CaptureProcess, ProcessExit, ProcessLauncher};
use photo_booth::backends::camera::{
    BackendError, BackendKind, BackendResult, Camera, HostProbe, PreviewContent, PreviewSurface,
};
use photo_booth::storage::PhotoStore;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Photo store in a fresh temp directory; keep the guard alive
pub fn temp_store() -> (PhotoStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = PhotoStore::ensure(tmp.path().join("PhotoBooth"));
    (store, tmp)
}

// ===== Host probe =====

/// Probe reading the device-tree model from a file the test controls
pub struct FileProbe {
    pub model_path: PathBuf,
    pub native: bool,
}

impl FileProbe {
    pub fn new(model_path: impl Into<PathBuf>, native: bool) -> Self {
        Self {
            model_path: model_path.into(),
            native,
        }
    }
}

impl HostProbe for FileProbe {
    fn device_tree_model(&self) -> Option<String> {
        std::fs::read_to_string(&self.model_path).ok()
    }

    fn hostname(&self) -> Option<String> {
        Some("test-host".to_string())
    }

    fn product_type(&self) -> Option<String> {
        None
    }

    fn native_framework_available(&self) -> bool {
        self.native
    }
}

/// Probe answering fixed values
pub struct StaticProbe {
    pub board: bool,
    pub native: bool,
}

impl HostProbe for StaticProbe {
    fn device_tree_model(&self) -> Option<String> {
        self.board.then(|| "Raspberry Pi 4 Model B Rev 1.4".to_string())
    }

    fn hostname(&self) -> Option<String> {
        Some("test-host".to_string())
    }

    fn product_type(&self) -> Option<String> {
        None
    }

    fn native_framework_available(&self) -> bool {
        self.native
    }
}

pub fn board_probe() -> Arc<StaticProbe> {
    Arc::new(StaticProbe {
        board: true,
        native: false,
    })
}

pub fn desktop_probe(native: bool) -> Arc<StaticProbe> {
    Arc::new(StaticProbe {
        board: false,
        native,
    })
}

// ===== Process launcher =====

/// What a launched program does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Never signals that it started
    NeverStart,
    /// Fails to start at once
    Missing,
    /// Starts and exits with the code without writing anything
    Exit(i32),
    /// Starts, writes a small JPEG to the `-o` path and exits 0
    WriteJpeg,
    /// Starts, writes bytes that are not an image and exits 0
    WriteGarbage,
    /// Starts and runs until killed
    RunForever,
}

/// Launcher replaying scripts in order; `NeverStart` once they run out
#[derive(Clone, Default)]
pub struct ScriptedLauncher {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    launches: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    kills: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Programs launched so far, in order
    pub fn programs(&self) -> Vec<String> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .map(|(program, _)| program.clone())
            .collect()
    }

    pub fn launches(&self) -> Vec<(String, Vec<String>)> {
        self.launches.lock().unwrap().clone()
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

fn output_path(args: &[String]) -> Option<PathBuf> {
    let index = args.iter().position(|arg| arg == "-o")?;
    args.get(index + 1).map(PathBuf::from)
}

impl ProcessLauncher for ScriptedLauncher {
    fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> BoxFuture<'static, io::Result<Box<dyn CaptureProcess>>> {
        self.launches
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::NeverStart);
        let output = output_path(args);
        let kills = Arc::clone(&self.kills);

        Box::pin(async move {
            let exit = match script {
                Script::NeverStart => futures::future::pending().await,
                Script::Missing => {
                    return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
                }
                Script::Exit(code) => Some(code),
                Script::WriteJpeg => {
                    if let Some(path) = &output {
                        write_jpeg(path);
                    }
                    Some(0)
                }
                Script::WriteGarbage => {
                    if let Some(path) = &output {
                        std::fs::write(path, b"definitely not a jpeg").unwrap();
                    }
                    Some(0)
                }
                Script::RunForever => None,
            };
            Ok(Box::new(ScriptedProcess { exit, kills }) as Box<dyn CaptureProcess>)
        })
    }
}

struct ScriptedProcess {
    /// `None` runs until killed
    exit: Option<i32>,
    kills: Arc<AtomicUsize>,
}

impl CaptureProcess for ScriptedProcess {
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ProcessExit>> {
        let exit = self.exit;
        Box::pin(async move {
            match exit {
                Some(code) => Ok(ProcessExit { code: Some(code) }),
                None => futures::future::pending().await,
            }
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

pub fn write_jpeg(path: &Path) {
    let image = image::RgbImage::from_pixel(32, 24, image::Rgb([30, 120, 200]));
    image.save(path).unwrap();
}

// ===== Media framework =====

/// Observable state of a fake media session
#[derive(Default)]
pub struct SessionProbe {
    pub active: AtomicBool,
    pub ready: AtomicBool,
    pub closed: AtomicBool,
    pub grabs: AtomicUsize,
}

/// Media framework with one fake device
pub struct FakeFramework {
    pub devices: Vec<String>,
    pub grab_delay: Duration,
    pub still: Option<(u32, u32)>,
    pub session: Arc<SessionProbe>,
}

impl FakeFramework {
    pub fn with_device() -> Self {
        Self {
            devices: vec!["Fake Webcam".to_string()],
            grab_delay: Duration::from_millis(50),
            still: Some((64, 48)),
            session: Arc::new(SessionProbe::default()),
        }
    }

    pub fn without_devices() -> Self {
        Self {
            devices: Vec::new(),
            ..Self::with_device()
        }
    }
}

impl MediaFramework for FakeFramework {
    fn video_inputs(&self) -> BackendResult<Vec<VideoInput>> {
        Ok(self
            .devices
            .iter()
            .enumerate()
            .map(|(index, name)| VideoInput {
                index,
                name: name.clone(),
            })
            .collect())
    }

    fn open(
        &self,
        _input: &VideoInput,
        preview: watch::Sender<PreviewContent>,
    ) -> BackendResult<Box<dyn MediaSession>> {
        self.session.active.store(true, Ordering::SeqCst);
        self.session.ready.store(true, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            probe: Arc::clone(&self.session),
            grab_delay: self.grab_delay,
            still: self.still,
            _preview: preview,
        }))
    }
}

struct FakeSession {
    probe: Arc<SessionProbe>,
    grab_delay: Duration,
    still: Option<(u32, u32)>,
    _preview: watch::Sender<PreviewContent>,
}

impl MediaSession for FakeSession {
    fn set_active(&mut self, active: bool) -> BackendResult<()> {
        self.probe.active.store(active, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.probe.active.load(Ordering::SeqCst)
    }

    fn is_ready_for_capture(&self) -> bool {
        self.probe.ready.load(Ordering::SeqCst)
    }

    fn grab_still(&self) -> BoxFuture<'static, BackendResult<RgbaImage>> {
        self.probe.grabs.fetch_add(1, Ordering::SeqCst);
        let delay = self.grab_delay;
        let still = self.still;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            match still {
                Some((w, h)) => Ok(RgbaImage::from_pixel(w, h, image::Rgba([10, 200, 10, 255]))),
                None => Err(BackendError::Other("device lost".to_string())),
            }
        })
    }

    fn close(&mut self) {
        self.probe.active.store(false, Ordering::SeqCst);
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

// ===== Camera =====

/// Camera wrapper recording which contract methods were called
pub struct RecordingCamera {
    inner: Box<dyn Camera>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingCamera {
    pub fn new(inner: Box<dyn Camera>) -> (Self, Arc<Mutex<Vec<&'static str>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inner,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn count_calls(calls: &Mutex<Vec<&'static str>>, name: &str) -> usize {
    calls.lock().unwrap().iter().filter(|c| **c == name).count()
}

impl Camera for RecordingCamera {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn initialize(&mut self) -> bool {
        self.record("initialize");
        self.inner.initialize()
    }

    fn cleanup(&mut self) {
        self.record("cleanup");
        self.inner.cleanup();
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn preview_surface(&self) -> Option<PreviewSurface> {
        self.inner.preview_surface()
    }

    fn start_preview(&mut self) {
        self.record("start_preview");
        self.inner.start_preview();
    }

    fn stop_preview(&mut self) {
        self.record("stop_preview");
        self.inner.stop_preview();
    }

    fn capture_photo(&mut self) {
        self.record("capture_photo");
        self.inner.capture_photo();
    }

    fn cancel_capture(&mut self) {
        self.record("cancel_capture");
        self.inner.cancel_capture();
    }

    fn settle(&mut self) -> BoxFuture<'static, ()> {
        self.record("settle");
        self.inner.settle()
    }
}
