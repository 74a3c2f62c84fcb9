// SPDX-License-Identifier: GPL-3.0-only

//! Photo Booth - a kiosk that walks visitors through a few choices and takes
//! their picture
//!
//! # Architecture
//!
//! - [`app`]: capture coordinator, session record and choice catalog
//! - [`backends`]: camera abstraction with native, subprocess and simulator backends
//! - [`config`]: user configuration handling
//! - [`storage`]: photos directory and file naming
//! - [`terminal`]: full-screen terminal kiosk

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{CaptureCoordinator, CaptureState, CoordinatorUpdate, SessionRecord};
pub use backends::camera::{BackendKind, Camera, CameraEvent, CameraSelector};
pub use config::Config;
pub use errors::{AppError, AppResult, CaptureError, CoordinatorError};
pub use storage::PhotoStore;
