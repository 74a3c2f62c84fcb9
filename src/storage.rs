// SPDX-License-Identifier: GPL-3.0-only

//! Storage location for captured photos
//!
//! All backends write into one directory, `<pictures>/PhotoBooth` by default,
//! falling back to the temp directory when it cannot be created. File names
//! carry a backend prefix and a local timestamp:
//! `<prefix>_<yyyy-MM-dd_hh-mm-ss>.<ext>`.

use crate::constants::storage::{FILE_TIMESTAMP_FORMAT, PHOTOS_SUBDIR};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolved photos directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    /// Resolve the per-user pictures location and ensure `PhotoBooth` inside it
    pub fn resolve() -> Self {
        let pictures = dirs::picture_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
            .unwrap_or_else(std::env::temp_dir);
        Self::ensure(pictures.join(PHOTOS_SUBDIR))
    }

    /// Use `preferred` if it can be created, otherwise the temp directory
    pub fn ensure(preferred: PathBuf) -> Self {
        Self::ensure_with_fallback(preferred, std::env::temp_dir())
    }

    /// Use `preferred` if it can be created, otherwise `fallback`
    pub fn ensure_with_fallback(preferred: PathBuf, fallback: PathBuf) -> Self {
        let existed = preferred.is_dir();
        match std::fs::create_dir_all(&preferred) {
            Ok(()) => {
                if existed {
                    debug!(path = %preferred.display(), "Photos directory");
                } else {
                    info!(path = %preferred.display(), "Created photos directory");
                }
                Self {
                    dir: absolute(preferred),
                }
            }
            Err(e) => {
                warn!(
                    path = %preferred.display(),
                    fallback = %fallback.display(),
                    error = %e,
                    "Failed to create photos directory, using fallback"
                );
                if let Err(e) = std::fs::create_dir_all(&fallback) {
                    warn!(path = %fallback.display(), error = %e, "Fallback directory unusable");
                }
                Self {
                    dir: absolute(fallback),
                }
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a new asset stamped with the current local time
    pub fn asset_path(&self, prefix: &str, extension: &str) -> PathBuf {
        self.asset_path_at(prefix, extension, Local::now())
    }

    /// Path for a new asset stamped with `at`
    pub fn asset_path_at(&self, prefix: &str, extension: &str, at: DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", prefix, at.format(FILE_TIMESTAMP_FORMAT), extension))
    }

    /// Make sure the directory still exists (it may have been removed underneath us)
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    }
}
