//! Whole-file separation model adapter
//!
//! Contract: `<separator> -n <model> -o <out_dir> <input>`, invoked once.
//! The tool writes stems under `<out_dir>/<model>/<track>/`; locating them
//! afterwards is the stem locator's job, not this adapter's.

use crate::config::ToolsConfig;
use crate::error::{RemasterError, Result};
use crate::run::CancelToken;
use crate::tool::command::{ToolCommand, resolve_program};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct Separator {
    program: PathBuf,
    model: String,
    timeout: Duration,
}

impl Separator {
    pub fn new(tools: &ToolsConfig) -> Result<Self> {
        Ok(Self {
            program: resolve_program(&tools.separator)?,
            model: tools.separator_model.clone(),
            timeout: tools.model_timeout(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the separator once over `input`, leaving stems under `out_dir`.
    pub fn separate(&self, input: &Path, out_dir: &Path, cancel: &CancelToken) -> Result<()> {
        info!(
            "separating {} with model '{}'",
            input.display(),
            self.model
        );

        ToolCommand::new(&self.program)
            .arg("-n")
            .arg(&self.model)
            .arg("-o")
            .arg(out_dir)
            .arg(input)
            .timeout(self.timeout)
            .run(cancel)
            .map_err(|e| e.with_stage(|e| RemasterError::model("separation", e.to_string())))?;

        Ok(())
    }
}
