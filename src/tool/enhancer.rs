//! Per-chunk enhancement model adapter
//!
//! Contract: `<enhancer> [extra args] -i chunk.wav -o enhanced.wav`, one
//! invocation per chunk, exactly one readable WAV back per invocation.

use crate::audio::WavAudio;
use crate::config::ToolsConfig;
use crate::error::{RemasterError, Result};
use crate::run::CancelToken;
use crate::tool::command::{ToolCommand, resolve_program};
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct Enhancer {
    program: PathBuf,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl Enhancer {
    pub fn new(tools: &ToolsConfig) -> Result<Self> {
        Ok(Self {
            program: resolve_program(&tools.enhancer)?,
            extra_args: tools.enhancer_args.clone(),
            timeout: tools.model_timeout(),
        })
    }

    /// Run the model over one chunk and load the result. Any failure mode
    /// (non-zero exit, missing file, unreadable WAV) is a model error for
    /// this chunk; nothing degraded is ever substituted.
    pub fn enhance_chunk(
        &self,
        index: usize,
        input: &Path,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<WavAudio> {
        debug!("enhancing chunk {}: {}", index, input.display());

        ToolCommand::new(&self.program)
            .args(&self.extra_args)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .timeout(self.timeout)
            .run(cancel)
            .map_err(|e| e.with_stage(|e| RemasterError::model_chunk(index, e.to_string())))?;

        if !output.is_file() {
            return Err(RemasterError::model_chunk(
                index,
                "tool reported success but produced no output",
            ));
        }

        WavAudio::from_file(output)
            .map_err(|e| RemasterError::model_chunk(index, format!("unreadable output: {}", e)))
    }
}
