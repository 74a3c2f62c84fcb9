// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer media session for the native backend
//!
//! Pipeline: `<device source> ! videoconvert ! appsink(caps=video/x-raw,format=RGBA)`.
//! The appsink callback runs on a streaming thread; it only stores the
//! latest frame and publishes it to the preview surface.

use super::{MediaFramework, MediaSession, VideoInput};
use crate::backends::camera::types::*;
use crate::constants::{native, timing};
use futures::future::BoxFuture;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use image::RgbaImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Media framework backed by GStreamer device discovery
#[derive(Debug, Default, Clone, Copy)]
pub struct GstFramework;

impl GstFramework {
    fn devices() -> BackendResult<Vec<gstreamer::Device>> {
        gstreamer::init().map_err(|e| BackendError::NotAvailable(e.to_string()))?;

        let monitor = gstreamer::DeviceMonitor::new();
        monitor.add_filter(Some(native::VIDEO_SOURCE_CLASS), None);
        monitor
            .start()
            .map_err(|e| BackendError::InitializationFailed(format!("Device monitor: {}", e)))?;
        let devices: Vec<gstreamer::Device> = monitor.devices().into_iter().collect();
        monitor.stop();

        Ok(devices)
    }
}

impl MediaFramework for GstFramework {
    fn video_inputs(&self) -> BackendResult<Vec<VideoInput>> {
        let inputs: Vec<VideoInput> = Self::devices()?
            .iter()
            .enumerate()
            .map(|(index, device)| VideoInput {
                index,
                name: device.display_name().to_string(),
            })
            .collect();
        debug!(count = inputs.len(), "Enumerated GStreamer video inputs");
        Ok(inputs)
    }

    fn open(
        &self,
        input: &VideoInput,
        preview: watch::Sender<PreviewContent>,
    ) -> BackendResult<Box<dyn MediaSession>> {
        let device = Self::devices()?
            .into_iter()
            .nth(input.index)
            .ok_or_else(|| BackendError::DeviceNotFound(input.name.clone()))?;

        let session = GstSession::new(input, &device, preview)?;
        Ok(Box::new(session))
    }
}

/// Running GStreamer pipeline bound to one camera device
pub struct GstSession {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    frames: watch::Sender<Option<Arc<RgbaImage>>>,
    active: bool,
    closed: bool,
}

impl GstSession {
    fn new(
        input: &VideoInput,
        device: &gstreamer::Device,
        preview: watch::Sender<PreviewContent>,
    ) -> BackendResult<Self> {
        info!(device = %input.name, "Creating GStreamer capture pipeline");

        let source = device
            .create_element(None)
            .map_err(|e| BackendError::InitializationFailed(format!("Source element: {}", e)))?;
        let convert = gstreamer::ElementFactory::make("videoconvert")
            .build()
            .map_err(|e| BackendError::InitializationFailed(format!("videoconvert: {}", e)))?;

        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", native::OUTPUT_FORMAT)
            .build();
        let appsink = AppSink::builder().name("sink").caps(&caps).build();
        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", native::MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        let pipeline = gstreamer::Pipeline::new();
        pipeline
            .add_many([&source, &convert, appsink.upcast_ref()])
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;
        gstreamer::Element::link_many([&source, &convert, appsink.upcast_ref()])
            .map_err(|e| BackendError::InitializationFailed(format!("Link failed: {}", e)))?;

        let (frames, _) = watch::channel(None);
        let frame_sender = frames.clone();

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);

                    let sample = appsink.pull_sample().map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to pull sample");
                        gstreamer::FlowError::Eos
                    })?;
                    let frame = sample_to_image(&sample).ok_or_else(|| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            warn!(frame = frame_num, "Dropping unreadable frame");
                        }
                        gstreamer::FlowError::Error
                    })?;

                    if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                        debug!(
                            frame = frame_num,
                            width = frame.width(),
                            height = frame.height(),
                            "Preview frame"
                        );
                    }

                    let frame = Arc::new(frame);
                    frame_sender.send_replace(Some(Arc::clone(&frame)));
                    preview.send_replace(PreviewContent::Frame(frame));

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        let mut session = Self {
            pipeline,
            appsink,
            frames,
            active: false,
            closed: false,
        };

        // Warm up the device; a failure here leaves nothing behind
        if let Err(e) = session.set_active(true) {
            session.close();
            return Err(e);
        }

        info!(device = %input.name, "GStreamer pipeline playing");
        Ok(session)
    }

    /// Map the first error on the bus to a backend error
    fn bus_error(&self) -> BackendError {
        let Some(bus) = self.pipeline.bus() else {
            return BackendError::Other("Pipeline has no bus".to_string());
        };

        match bus.pop_filtered(&[gstreamer::MessageType::Error]) {
            Some(msg) => match msg.view() {
                gstreamer::MessageView::Error(err) => {
                    let error = err.error();
                    if error.matches(gstreamer::ResourceError::NotAuthorized) {
                        BackendError::PermissionDenied(error.to_string())
                    } else if error.matches(gstreamer::ResourceError::NotFound) {
                        BackendError::DeviceNotFound(error.to_string())
                    } else {
                        BackendError::Other(error.to_string())
                    }
                }
                _ => BackendError::Other("Unknown pipeline error".to_string()),
            },
            None => BackendError::Other("Pipeline failed to change state".to_string()),
        }
    }
}

/// Copy an RGBA sample into a tightly packed image
fn sample_to_image(sample: &gstreamer::Sample) -> Option<RgbaImage> {
    let buffer = sample.buffer()?;
    if buffer.flags().contains(gstreamer::BufferFlags::CORRUPTED) {
        return None;
    }
    let info = VideoInfo::from_caps(sample.caps()?).ok()?;
    let map = buffer.map_readable().ok()?;

    let width = info.width();
    let height = info.height();
    let stride = *info.stride().first()? as usize;
    let offset = *info.offset().first()?;
    let row_bytes = width as usize * 4;
    let data = map.as_slice();

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = offset + row * stride;
        pixels.extend_from_slice(data.get(start..start + row_bytes)?);
    }

    RgbaImage::from_raw(width, height, pixels)
}

impl MediaSession for GstSession {
    fn set_active(&mut self, active: bool) -> BackendResult<()> {
        if self.closed {
            return Err(BackendError::NotAvailable("Session closed".to_string()));
        }

        let (target, timeout) = if active {
            (gstreamer::State::Playing, timing::START_TIMEOUT_SECS)
        } else {
            (gstreamer::State::Paused, timing::STOP_TIMEOUT_SECS)
        };

        debug!(?target, "Changing pipeline state");
        if self.pipeline.set_state(target).is_err() {
            return Err(self.bus_error());
        }

        let (result, state, pending) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timeout));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");
        if result.is_err() {
            return Err(self.bus_error());
        }

        self.active = active;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active && !self.closed
    }

    fn is_ready_for_capture(&self) -> bool {
        self.is_active() && self.frames.borrow().is_some()
    }

    fn grab_still(&self) -> BoxFuture<'static, BackendResult<RgbaImage>> {
        let mut frames = self.frames.subscribe();
        Box::pin(async move {
            // Prefer a frame produced after the request over the cached one
            let wait = timing::STILL_FRAME_TIMEOUT;
            match tokio::time::timeout(wait, frames.changed()).await {
                Ok(Ok(())) | Err(_) => {}
                Ok(Err(_)) => {
                    return Err(BackendError::NotAvailable("Pipeline stopped".to_string()));
                }
            }

            frames
                .borrow()
                .as_ref()
                .map(|frame| frame.as_ref().clone())
                .ok_or_else(|| BackendError::Other("No frame available".to_string()))
        })
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }

        info!("Stopping GStreamer pipeline");
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to stop pipeline");
        }
        let (result, state, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, "Pipeline stopped");

        self.active = false;
        self.closed = true;
    }
}

impl Drop for GstSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// True if GStreamer initialises and carries the elements the pipeline needs
pub fn available() -> bool {
    if let Err(e) = gstreamer::init() {
        debug!(error = %e, "GStreamer init failed");
        return false;
    }

    ["videoconvert", "appsink"].iter().all(|name| {
        let found = gstreamer::ElementFactory::find(name).is_some();
        if !found {
            debug!(element = name, "GStreamer element missing");
        }
        found
    })
}
