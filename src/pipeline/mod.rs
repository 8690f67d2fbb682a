//! Pipeline stages and the drivers that sequence them

pub mod chunker;
pub mod pool;
pub mod recombiner;
pub mod separate;
pub mod stems;
pub mod upscale;

pub use separate::SeparateRequest;
pub use upscale::UpscaleRequest;

use std::path::{Path, PathBuf};

/// Final output location for `input`: its file stem plus `suffix`, always
/// as a WAV inside `output_dir`.
pub fn output_path(output_dir: &Path, input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{}{}.wav", stem, suffix))
}
