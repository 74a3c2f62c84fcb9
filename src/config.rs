// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as pretty JSON in `<config dir>/photo-booth/config.json`. A missing
//! file yields defaults; an unreadable one yields defaults and a warning.

use crate::backends::camera::BackendKind;
use crate::constants::app_info::{APP_DIR_NAME, DEFAULT_INPUT_METHOD, INPUT_METHOD_ENV};
use crate::constants::timing::COUNTDOWN_SECONDS;
use crate::errors::{AppError, AppResult};
use crate::storage::PhotoStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend to use
    pub backend: BackendKind,
    /// Photos directory override (defaults to `<pictures>/PhotoBooth`)
    pub photos_dir: Option<PathBuf>,
    /// Directory holding the choice images (`weapon1.jpg` ...)
    pub catalog_dir: Option<PathBuf>,
    /// On-screen input method exported for GUI children
    pub input_method: String,
    /// Countdown length in seconds
    pub countdown_seconds: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::AutoDetect,
            photos_dir: None,
            catalog_dir: None,
            input_method: DEFAULT_INPUT_METHOD.to_string(),
            countdown_seconds: COUNTDOWN_SECONDS,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE))
    }

    /// Load from the default location
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "Config file missing, using defaults");
            return Self::default();
        }

        match Self::read(path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded configuration");
                config.normalized()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid configuration, using defaults");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Clamp out-of-range values
    pub fn normalized(mut self) -> Self {
        self.countdown_seconds = self.countdown_seconds.max(1);
        self
    }

    /// Photos directory this configuration points at
    pub fn photo_store(&self) -> PhotoStore {
        match &self.photos_dir {
            Some(dir) => PhotoStore::ensure(dir.clone()),
            None => PhotoStore::resolve(),
        }
    }

    /// Export the input method for GUI children
    pub fn apply_environment(&self) {
        if self.input_method.is_empty() {
            return;
        }
        debug!(var = INPUT_METHOD_ENV, value = %self.input_method, "Setting input method");
        // SAFETY: called from main before the runtime or any other thread starts
        unsafe {
            std::env::set_var(INPUT_METHOD_ENV, &self.input_method);
        }
    }
}
