// Command-line configuration and logging setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Live sticker booth: filter the webcam (or a file) and stamp stickers on it.
#[derive(Debug, Clone, Parser)]
#[command(name = "sticker-cam", version, about)]
pub struct Config {
    /// Camera device index
    #[arg(long = "camera", default_value_t = 0)]
    pub camera_index: u32,

    /// Requested capture width (the device may pick the closest it supports)
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Directory of sticker PNGs
    #[arg(long, default_value = "stickers")]
    pub stickers: PathBuf,

    /// Image to load at startup and on `L`
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Where `S` writes the current render
    #[arg(long, default_value = "output.png")]
    pub output: PathBuf,

    /// Initial filter (unknown names fall back to identity)
    #[arg(long, default_value = "identity")]
    pub filter: String,

    /// Start without opening the camera
    #[arg(long)]
    pub no_camera: bool,

    /// Camera poll interval in milliseconds
    #[arg(long, default_value_t = 10)]
    pub poll_ms: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    /// Install the global fmt subscriber. RUST_LOG wins over `--log-level`.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
    }
}
