//! The upscale pipeline: normalize, chunk, enhance, recombine
//!
//! Stages run strictly in order; parallelism lives inside the enhance
//! stage only. The run context is consumed here so temp cleanup happens
//! exactly once, on success and on failure alike.

use crate::audio::WavAudio;
use crate::config::Config;
use crate::error::{RemasterError, Result};
use crate::pipeline::pool::{ChunkPool, ChunkTask};
use crate::pipeline::{chunker, output_path, recombiner};
use crate::progress::{ProgressEvent, Stage};
use crate::run::RunContext;
use crate::tool::{Enhancer, Ffmpeg};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

pub struct UpscaleRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
}

/// Drive the whole upscale pipeline and return the published output path.
pub fn run(config: &Config, request: &UpscaleRequest, ctx: RunContext) -> Result<PathBuf> {
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

fn stages(config: &Config, request: &UpscaleRequest, ctx: &RunContext) -> Result<PathBuf> {
    if !request.input.is_file() {
        return Err(RemasterError::Conversion {
            path: request.input.clone(),
            reason: "input file does not exist".to_string(),
        });
    }

    ctx.cancel().check()?;
    ctx.progress().stage(Stage::Normalize);
    let ffmpeg = Ffmpeg::new(&config.tools)?;
    let wav_path = ffmpeg.normalize(&request.input, ctx.temp_dir(), ctx.cancel())?;

    let mut audio = WavAudio::from_file(&wav_path)?;
    info!(
        "normalized input: {:.1} s at {} Hz, {} channel(s)",
        audio.duration_secs(),
        audio.sample_rate(),
        audio.channels()
    );
    if config.audio.downmix && audio.channels() > 1 {
        info!("downmixing {} channels to mono", audio.channels());
        audio = audio.downmix_to_mono();
    }

    ctx.cancel().check()?;
    ctx.progress().stage(Stage::Chunk);
    let plan = chunker::plan(&audio, &request.input, config.chunk_seconds())?;
    let chunk_dir = ctx.subdir("chunks")?;
    let chunk_files = chunker::materialize(&audio, &plan, &chunk_dir)?;
    info!(
        "run {}: {} chunk(s) of up to {} frames",
        ctx.run_id(),
        plan.len(),
        plan.frames_per_chunk
    );

    ctx.cancel().check()?;
    ctx.progress().stage(Stage::Enhance);
    let enhanced_dir = ctx.subdir("enhanced")?;
    let tasks: Vec<ChunkTask> = chunk_files
        .iter()
        .enumerate()
        .map(|(index, input)| ChunkTask {
            index,
            input: input.clone(),
            output: enhanced_dir.join(format!("enhanced_{:06}.wav", index)),
        })
        .collect();

    let enhancer = Arc::new(Enhancer::new(&config.tools)?);
    let pool = ChunkPool::new(enhancer, config.jobs());
    let enhanced = pool.run(tasks, ctx.cancel(), ctx.progress())?;

    ctx.cancel().check()?;
    ctx.progress().stage(Stage::Recombine);
    let joined = recombiner::concat_chunks(&enhanced)?;

    std::fs::create_dir_all(&request.output_dir)?;
    let output = output_path(&request.output_dir, &request.input, "_upscaled");
    joined.save_to_file(&output)?;
    info!("run {}: wrote {}", ctx.run_id(), output.display());

    Ok(output)
}
