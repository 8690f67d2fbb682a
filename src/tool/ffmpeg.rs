//! Input normalization through ffmpeg
//!
//! Two subprocess contracts: faststart repair for MP4 containers
//! (`-c copy -movflags faststart`) and transcode-to-WAV
//! (`-vn -acodec pcm_s16le`). `normalize` chains them into the canonical
//! intermediate WAV every pipeline starts from.

use crate::config::ToolsConfig;
use crate::error::{RemasterError, Result};
use crate::run::CancelToken;
use crate::tool::command::{ToolCommand, resolve_program};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct Ffmpeg {
    program: PathBuf,
    timeout: Duration,
}

impl Ffmpeg {
    pub fn new(tools: &ToolsConfig) -> Result<Self> {
        Ok(Self {
            program: resolve_program(&tools.ffmpeg)?,
            timeout: tools.ffmpeg_timeout(),
        })
    }

    /// Remux an MP4 so its metadata atom sits at the front of the file.
    pub fn repair_mp4(&self, input: &Path, output: &Path, cancel: &CancelToken) -> Result<()> {
        info!("repairing {} (faststart)", input.display());

        ToolCommand::new(&self.program)
            .args(["-hide_banner", "-y", "-i"])
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart"])
            .arg(output)
            .timeout(self.timeout)
            .run(cancel)
            .map_err(|e| {
                e.with_stage(|e| RemasterError::Repair {
                    path: input.to_path_buf(),
                    reason: e.to_string(),
                })
            })?;

        Ok(())
    }

    /// Transcode any input to 16-bit PCM WAV, dropping video streams.
    pub fn to_wav(&self, input: &Path, output: &Path, cancel: &CancelToken) -> Result<()> {
        info!("converting {} to WAV", input.display());

        ToolCommand::new(&self.program)
            .args(["-hide_banner", "-y", "-i"])
            .arg(input)
            .args(["-vn", "-acodec", "pcm_s16le"])
            .arg(output)
            .timeout(self.timeout)
            .run(cancel)
            .map_err(|e| {
                e.with_stage(|e| RemasterError::Conversion {
                    path: input.to_path_buf(),
                    reason: e.to_string(),
                })
            })?;

        Ok(())
    }

    /// Produce the canonical intermediate WAV for `input` inside `work_dir`.
    /// MP4 containers get the faststart repair pass first. The WAV keeps the
    /// source's file stem, which later names the separator's track directory.
    pub fn normalize(&self, input: &Path, work_dir: &Path, cancel: &CancelToken) -> Result<PathBuf> {
        let source = if has_extension(input, "mp4") {
            let repaired = work_dir.join("repaired.mp4");
            self.repair_mp4(input, &repaired, cancel)?;
            repaired
        } else {
            input.to_path_buf()
        };

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        let wav = work_dir.join(format!("{}.wav", stem));

        self.to_wav(&source, &wav, cancel)?;
        Ok(wav)
    }
}

/// Standalone faststart repair with an atomic publish: ffmpeg writes into a
/// hidden temp sibling which is renamed over `output` on success.
pub fn repair_file(
    tools: &ToolsConfig,
    input: &Path,
    output: &Path,
    cancel: &CancelToken,
) -> Result<PathBuf> {
    let ffmpeg = Ffmpeg::new(tools)?;

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let tmp = tempfile::Builder::new()
        .prefix(".repair-")
        .suffix(".mp4")
        .tempfile_in(&parent)?;

    ffmpeg.repair_mp4(input, tmp.path(), cancel)?;

    tmp.persist(output)
        .map_err(|e| RemasterError::Io(e.error))?;
    Ok(output.to_path_buf())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_extension() {
        assert!(has_extension(Path::new("video.mp4"), "mp4"));
        assert!(has_extension(Path::new("video.MP4"), "mp4"));
        assert!(!has_extension(Path::new("audio.wav"), "mp4"));
        assert!(!has_extension(Path::new("noext"), "mp4"));
    }

    #[test]
    fn test_missing_ffmpeg_binary() {
        let tools = ToolsConfig {
            ffmpeg: PathBuf::from("no-such-ffmpeg-remaster-test"),
            ..Default::default()
        };
        assert!(matches!(
            Ffmpeg::new(&tools),
            Err(RemasterError::MissingTool { .. })
        ));
    }
}
