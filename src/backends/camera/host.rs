// SPDX-License-Identifier: GPL-3.0-only

//! Host platform probing
//!
//! Platform detection reads a device-tree file and host identity strings.
//! It sits behind [`HostProbe`] so selection logic can be tested without
//! touching the real filesystem.

use crate::constants::subprocess::{BOARD_MODEL_MARKER, DEVICE_TREE_MODEL, HOST_MARKER};
use std::path::PathBuf;
use tracing::debug;

/// Source of host facts used for backend selection
pub trait HostProbe: Send + Sync {
    /// Content of `/proc/device-tree/model`, if readable
    fn device_tree_model(&self) -> Option<String>;

    /// Network host name
    fn hostname(&self) -> Option<String>;

    /// Operating system product type (e.g. `raspbian`, `debian`)
    fn product_type(&self) -> Option<String>;

    /// True if the native media framework can be used on this host
    fn native_framework_available(&self) -> bool;

    /// True if this host is the single-board computer
    ///
    /// Evidence in priority order: the device-tree model names a Raspberry
    /// Pi, then the hostname or product type mentions "raspberry".
    fn is_single_board_computer(&self) -> bool {
        if let Some(model) = self.device_tree_model()
            && model.to_lowercase().contains(BOARD_MODEL_MARKER)
        {
            debug!(model = %model.trim(), "Detected Raspberry Pi via device tree");
            return true;
        }

        let mentions_board = |value: Option<String>| {
            value
                .map(|v| v.to_lowercase().contains(HOST_MARKER))
                .unwrap_or(false)
        };

        if mentions_board(self.hostname()) || mentions_board(self.product_type()) {
            debug!("Detected Raspberry Pi via hostname/product type");
            return true;
        }

        false
    }
}

/// Probe backed by the running system
#[derive(Debug, Clone)]
pub struct SystemProbe {
    model_path: PathBuf,
    os_release_path: PathBuf,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            model_path: PathBuf::from(DEVICE_TREE_MODEL),
            os_release_path: PathBuf::from("/etc/os-release"),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SystemProbe {
    fn device_tree_model(&self) -> Option<String> {
        let bytes = std::fs::read(&self.model_path).ok()?;
        // Device-tree strings are NUL terminated
        let text = String::from_utf8_lossy(&bytes)
            .trim_end_matches('\0')
            .to_string();
        Some(text)
    }

    fn hostname(&self) -> Option<String> {
        let mut buf = [0u8; 256];
        // SAFETY: buf is valid for buf.len() bytes and gethostname writes at most that many
        let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
        if rc != 0 {
            return None;
        }
        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Some(String::from_utf8_lossy(&buf[..len]).into_owned())
    }

    fn product_type(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.os_release_path).ok()?;
        parse_os_release_id(&content)
    }

    fn native_framework_available(&self) -> bool {
        super::native::gstreamer_available()
    }
}

/// Extract `ID=` from os-release content
fn parse_os_release_id(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.strip_prefix("ID=")
            .map(|value| value.trim().trim_matches('"').to_string())
    })
}
