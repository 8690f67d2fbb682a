//! Remaster - Audio Upscaling and Stem Separation Pipeline
//!
//! Drives external model CLIs (enhancer, separator) and ffmpeg through a
//! staged pipeline with cancellation, timeouts and run-scoped temp storage.

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod tool;

pub use config::{Cli, Command, Config};
pub use error::{RemasterError, Result};
pub use pipeline::{SeparateRequest, UpscaleRequest};
pub use progress::{ProgressEvent, ProgressSender, Stage};
pub use run::{CancelToken, RunContext};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Default filter is overridable through `RUST_LOG`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .try_init()
        .ok();
}
