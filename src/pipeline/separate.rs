//! The separation pipeline: normalize, separate into stems, mix back down
//!
//! The separator runs once over the whole normalized track. Its four stems
//! are located through [`DirectoryStemLocator`], loaded, verified against
//! each other and summed sample-wise into a single remixed file.

use crate::audio::{WavAudio, mix_stems};
use crate::config::Config;
use crate::error::{RemasterError, Result};
use crate::pipeline::output_path;
use crate::pipeline::stems::{DirectoryStemLocator, StemLocator};
use crate::progress::{ProgressEvent, Stage};
use crate::run::RunContext;
use crate::tool::{Ffmpeg, Separator};
use log::info;
use std::path::PathBuf;

pub struct SeparateRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
}

/// Drive the whole separation pipeline and return the published output path.
pub fn run(config: &Config, request: &SeparateRequest, ctx: RunContext) -> Result<PathBuf> {
    let outcome = stages(config, request, &ctx);

    match &outcome {
        Ok(output) => ctx.progress().emit(ProgressEvent::Completed {
            output: output.clone(),
        }),
        Err(e) => ctx.progress().emit(ProgressEvent::Failed {
            message: e.to_string(),
        }),
    }

    ctx.finish();
    outcome
}

fn stages(config: &Config, request: &SeparateRequest, ctx: &RunContext) -> Result<PathBuf> {
    if !request.input.is_file() {
        return Err(RemasterError::Conversion {
            path: request.input.clone(),
            reason: "input file does not exist".to_string(),
        });
    }

    ctx.cancel().check()?;
    ctx.progress().stage(Stage::Normalize);
    let ffmpeg = Ffmpeg::new(&config.tools)?;
    // Stereo is kept: the separator wants the full image, unlike the enhancer.
    let wav_path = ffmpeg.normalize(&request.input, ctx.temp_dir(), ctx.cancel())?;

    ctx.cancel().check()?;
    ctx.progress().stage(Stage::Separate);
    let separated_dir = ctx.subdir("separated")?;
    let separator = Separator::new(&config.tools)?;
    separator.separate(&wav_path, &separated_dir, ctx.cancel())?;

    // The separator names its track directory after the input's file stem.
    let track = wav_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let locator = DirectoryStemLocator::new(&separated_dir, separator.model());
    let stem_set = locator.locate(&track)?;

    let mut loaded = Vec::with_capacity(stem_set.len());
    for (name, path) in stem_set.iter() {
        info!("loading stem '{}' from {}", name, path.display());
        let audio = WavAudio::from_file(path)?;
        loaded.push((name.to_string(), audio));
    }

    ctx.cancel().check()?;
    ctx.progress().stage(Stage::Recombine);
    let mixed = mix_stems(&loaded)?;

    std::fs::create_dir_all(&request.output_dir)?;
    let output = output_path(&request.output_dir, &request.input, "_mix");
    mixed.save_to_file(&output)?;
    info!("run {}: wrote {}", ctx.run_id(), output.display());

    Ok(output)
}
