// SPDX-License-Identifier: GPL-3.0-only

//! Child-process runner for the external capture programs

use futures::future::BoxFuture;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tracing::debug;

use crate::constants::subprocess::{
    CAPTURE_HEIGHT, CAPTURE_TIMEOUT_MS, CAPTURE_WIDTH, JPEG_QUALITY, LEGACY_PROGRAM,
    PRIMARY_PROGRAM,
};

/// How a capture program ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit status, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A started capture program
pub trait CaptureProcess: Send {
    /// Wait for the program to exit
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ProcessExit>>;

    /// Kill the program and reap it
    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>>;
}

/// Starts capture programs
///
/// The returned future resolves once the program is running (or failed to
/// start); callers bound it with their own start-up timeout.
pub trait ProcessLauncher: Send + Sync {
    fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> BoxFuture<'static, io::Result<Box<dyn CaptureProcess>>>;
}

/// Arguments for `libcamera-still`
pub fn primary_args(output: &Path) -> Vec<String> {
    vec![
        "-o".to_string(),
        output.display().to_string(),
        "--width".to_string(),
        CAPTURE_WIDTH.to_string(),
        "--height".to_string(),
        CAPTURE_HEIGHT.to_string(),
        "--quality".to_string(),
        JPEG_QUALITY.to_string(),
        "--timeout".to_string(),
        CAPTURE_TIMEOUT_MS.to_string(),
    ]
}

/// Arguments for the legacy `raspistill`
pub fn legacy_args(output: &Path) -> Vec<String> {
    vec![
        "-o".to_string(),
        output.display().to_string(),
        "-w".to_string(),
        CAPTURE_WIDTH.to_string(),
        "-h".to_string(),
        CAPTURE_HEIGHT.to_string(),
        "-q".to_string(),
        JPEG_QUALITY.to_string(),
        "-t".to_string(),
        CAPTURE_TIMEOUT_MS.to_string(),
    ]
}

/// Programs tried in order, with their arguments for `output`
pub fn capture_commands(output: &Path) -> [(&'static str, Vec<String>); 2] {
    [
        (PRIMARY_PROGRAM, primary_args(output)),
        (LEGACY_PROGRAM, legacy_args(output)),
    ]
}

/// Launcher spawning real programs through tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> BoxFuture<'static, io::Result<Box<dyn CaptureProcess>>> {
        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let program = program.to_string();

        Box::pin(async move {
            let child = command.spawn()?;
            debug!(program = %program, pid = ?child.id(), "Capture program started");
            Ok(Box::new(TokioProcess { child, program }) as Box<dyn CaptureProcess>)
        })
    }
}

struct TokioProcess {
    child: tokio::process::Child,
    program: String,
}

impl CaptureProcess for TokioProcess {
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ProcessExit>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            debug!(program = %self.program, status = %status, "Capture program exited");
            Ok(ProcessExit {
                code: status.code(),
            })
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move { self.child.kill().await })
    }
}
