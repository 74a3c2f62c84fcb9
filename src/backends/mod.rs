// SPDX-License-Identifier: GPL-3.0-only

//! Hardware abstraction layer
//!
//! - [`camera`]: camera capability, its three backends and backend selection

pub mod camera;
