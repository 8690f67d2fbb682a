//! Non-overlapping chunk planning and materialization
//!
//! Chunks cover the source exactly once: `ceil(total / per_chunk)` of them,
//! every one full length except possibly the last, no overlap, no gap.
//! Concatenating them in index order reproduces the source sample for
//! sample.

use crate::audio::WavAudio;
use crate::error::{RemasterError, Result};
use log::info;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// One planned chunk: a half-open frame range of the source audio.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub start_frame: usize,
    pub end_frame: usize,
}

impl Chunk {
    pub fn frames(&self) -> usize {
        self.end_frame - self.start_frame
    }
}

#[derive(Debug, Clone)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    pub frames_per_chunk: usize,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Plan chunks of at most `chunk_seconds` over `audio`. Fails with
/// [`RemasterError::EmptyInput`] when the audio holds no samples.
pub fn plan(audio: &WavAudio, source: &Path, chunk_seconds: f64) -> Result<ChunkPlan> {
    let total = audio.frames();
    if total == 0 {
        return Err(RemasterError::EmptyInput {
            path: source.to_path_buf(),
        });
    }

    let per_chunk = ((chunk_seconds * audio.sample_rate() as f64) as usize).max(1);
    let count = total.div_ceil(per_chunk);

    let chunks = (0..count)
        .map(|index| {
            let start_frame = index * per_chunk;
            let end_frame = (start_frame + per_chunk).min(total);
            Chunk {
                index,
                start_frame,
                end_frame,
            }
        })
        .collect();

    info!("planned {} chunk(s) of up to {} frames", count, per_chunk);

    Ok(ChunkPlan {
        chunks,
        frames_per_chunk: per_chunk,
    })
}

/// Write one WAV per planned chunk into `dir`. Names are zero-padded by
/// index so a directory listing reads in recombination order.
pub fn materialize(audio: &WavAudio, plan: &ChunkPlan, dir: &Path) -> Result<Vec<PathBuf>> {
    plan.chunks
        .par_iter()
        .map(|chunk| {
            let path = dir.join(format!("chunk_{:06}.wav", chunk.index));
            let data = audio.data().slice_frames(chunk.start_frame, chunk.end_frame);
            let piece = WavAudio::from_data(audio.sample_rate(), data, audio.format());
            piece.save_to_file(&path)?;
            Ok(path)
        })
        .collect()
}
