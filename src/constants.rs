// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Capture session timing
pub mod timing {
    use super::Duration;

    /// Default countdown length in seconds
    pub const COUNTDOWN_SECONDS: u32 = 3;

    /// Period of the countdown timer
    pub const COUNTDOWN_TICK: Duration = Duration::from_millis(1000);

    /// How long the capture indicator is shown before the shutter fires
    pub const CAPTURE_INDICATOR_DELAY: Duration = Duration::from_millis(500);

    /// How long a capture error stays on screen before preview resumes
    pub const ERROR_BANNER_DWELL: Duration = Duration::from_millis(3000);

    /// Simulated exposure time of the simulator backend
    pub const SIMULATOR_CAPTURE_DELAY: Duration = Duration::from_millis(1000);

    /// Maximum wait for an external capture program to start
    pub const PROCESS_START_TIMEOUT: Duration = Duration::from_secs(3);

    /// Maximum wait for an external capture program to die after kill
    pub const PROCESS_KILL_TIMEOUT: Duration = Duration::from_secs(3);

    /// GStreamer state change timeout when starting the native pipeline
    ///
    /// Bounded by the external program start-up wait, the longest blocking
    /// call allowed on the UI scheduler.
    pub const START_TIMEOUT_SECS: u64 = 3;

    /// GStreamer state change timeout when stopping the native pipeline
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Maximum wait for a fresh frame when grabbing a native still
    pub const STILL_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

    /// Log frame statistics every N frames
    pub const FRAME_LOG_INTERVAL: u64 = 60;

    /// Pause between readiness checks in the one-shot photo command
    pub const CLI_WARMUP_DELAY: Duration = Duration::from_millis(500);

    /// Readiness checks before the one-shot photo command gives up
    pub const CLI_WARMUP_ATTEMPTS: u32 = 10;

    /// Maximum wait for a photo in the one-shot photo command
    pub const CLI_CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

    /// Terminal redraw interval
    pub const UI_FRAME_INTERVAL: Duration = Duration::from_millis(33);
}

/// Photo storage layout
pub mod storage {
    /// Subdirectory created inside the user's pictures directory
    pub const PHOTOS_SUBDIR: &str = "PhotoBooth";

    /// chrono format for the timestamp embedded in file names
    pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

    /// File name prefix of native backend captures
    pub const NATIVE_PREFIX: &str = "photo";

    /// File name prefix of subprocess backend captures
    pub const SUBPROCESS_PREFIX: &str = "pi_photo";

    /// File name prefix of simulator captures
    pub const SIMULATOR_PREFIX: &str = "mock_photo";
}

/// External still-capture programs used on the single-board computer
pub mod subprocess {
    /// Preferred capture program
    pub const PRIMARY_PROGRAM: &str = "libcamera-still";

    /// Legacy capture program for older OS images
    pub const LEGACY_PROGRAM: &str = "raspistill";

    pub const CAPTURE_WIDTH: u32 = 1920;
    pub const CAPTURE_HEIGHT: u32 = 1080;
    pub const JPEG_QUALITY: u8 = 95;

    /// Capture timeout passed to the program, in milliseconds (immediate capture)
    pub const CAPTURE_TIMEOUT_MS: u32 = 1;

    /// Device-tree node naming the board model
    pub const DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";

    /// Marker looked for in the device-tree model string
    pub const BOARD_MODEL_MARKER: &str = "raspberry pi";

    /// Marker looked for in hostname and product type
    pub const HOST_MARKER: &str = "raspberry";
}

/// Simulator backend test image
pub mod simulator {
    pub const IMAGE_WIDTH: u32 = 800;
    pub const IMAGE_HEIGHT: u32 = 600;

    /// Heading rendered in the middle of the test image
    pub const HEADING: &str = "📷 MOCK PHOTO\n\nPhoto Booth Test";

    /// chrono format of the timestamp stamped bottom-left
    pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Width of the white frame around the image
    pub const BORDER_WIDTH: u32 = 4;
}

/// Native backend still encoding
pub mod native {
    /// JPEG quality used for stills ("very high quality")
    pub const JPEG_QUALITY: u8 = 100;

    /// GStreamer device class enumerated for cameras
    pub const VIDEO_SOURCE_CLASS: &str = "Video/Source";

    /// Pixel format negotiated on the preview appsink
    pub const OUTPUT_FORMAT: &str = "RGBA";

    /// Appsink queue depth
    pub const MAX_BUFFERS: u32 = 2;
}

/// Choice catalog layout
pub mod catalog {
    /// Choice categories in screen order
    pub const CATEGORIES: [&str; 3] = ["weapon", "land", "companion"];

    /// Entries per category (`weapon1` ... `weapon4`)
    pub const ENTRIES_PER_CATEGORY: u32 = 4;

    /// Bounding box choice images are scaled into
    pub const ICON_SIZE: u32 = 150;

    /// File extension of choice images
    pub const IMAGE_EXTENSION: &str = "jpg";
}

/// Application metadata
pub mod app_info {
    pub const APP_DIR_NAME: &str = "photo-booth";

    /// Version string including the git commit
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    /// Default on-screen input method handed to GUI children
    pub const DEFAULT_INPUT_METHOD: &str = "qtvirtualkeyboard";

    /// Environment variable selecting the on-screen input method
    pub const INPUT_METHOD_ENV: &str = "QT_IM_MODULE";
}
