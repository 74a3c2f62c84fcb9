// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use photo_booth::Config;
use photo_booth::backends::camera::BackendKind;
use photo_booth::constants::app_info::{APP_DIR_NAME, version};
use std::path::PathBuf;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "photo-booth")]
#[command(about = "Kiosk photo booth with pluggable camera backends")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Camera backend: auto, native, subprocess or simulator
    #[arg(short, long, global = true, value_parser = parse_backend)]
    backend: Option<BackendKind>,

    /// Directory photos are saved to (default: ~/Pictures/PhotoBooth)
    #[arg(long, global = true)]
    photos_dir: Option<PathBuf>,

    /// Configuration file (default: ~/.config/photo-booth/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the kiosk in the terminal (default)
    Kiosk,

    /// Report the camera backend this host would use
    Detect,

    /// Take a single photo
    Photo,
}

fn parse_backend(value: &str) -> Result<BackendKind, String> {
    BackendKind::from_arg(value).ok_or_else(|| {
        format!(
            "unknown backend '{}', expected one of: auto, native, subprocess, simulator",
            value
        )
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let kiosk = matches!(cli.command, None | Some(Commands::Kiosk));

    init_logging(kiosk);
    tracing::info!(version = version(), "Starting photo booth");

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(dir) = cli.photos_dir {
        config.photos_dir = Some(dir);
    }
    config.apply_environment();

    match cli.command {
        Some(Commands::Detect) => cli::detect(&config),
        Some(Commands::Photo) => cli::take_photo(&config),
        Some(Commands::Kiosk) | None => photo_booth::terminal::run(config),
    }
}

/// Set RUST_LOG to control the level, e.g. RUST_LOG=photo_booth=debug
///
/// The kiosk owns the terminal, so its log goes to
/// `<cache dir>/photo-booth/photo-booth.log` instead of stderr.
fn init_logging(kiosk: bool) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    let log_file = kiosk
        .then(|| {
            let dir = dirs::cache_dir()?.join(APP_DIR_NAME);
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("photo-booth.log"))
                .ok()
        })
        .flatten();

    match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .init(),
        None if kiosk => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::sink)
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .init(),
    }
}
