//! Run-scoped state: temp storage, cancellation, progress wiring
//!
//! Every pipeline invocation owns a [`RunContext`]. All intermediate files
//! live under its randomized temp dir, so concurrent runs never collide and
//! one `finish` call cleans everything up.

use crate::error::{RemasterError, Result};
use crate::progress::ProgressSender;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

/// Shared cancellation flag, checked at stage boundaries and inside the
/// subprocess poll loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` once the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(RemasterError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    temp: TempDir,
    cancel: CancelToken,
    progress: ProgressSender,
    keep_temp: bool,
}

impl RunContext {
    pub fn new(progress: ProgressSender, cancel: CancelToken, keep_temp: bool) -> Result<Self> {
        let temp = tempfile::Builder::new().prefix("remaster-").tempdir()?;
        let run_id = temp
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "remaster-run".to_string());
        debug!("run {}: temp dir {}", run_id, temp.path().display());

        Ok(Self {
            run_id,
            temp,
            cancel,
            progress,
            keep_temp,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn cancel(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn progress(&self) -> &ProgressSender {
        &self.progress
    }

    /// Create (if needed) and return a named subdirectory of the temp dir.
    pub fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.temp.path().join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Tear down the run's temp storage. With `keep_temp` the directory
    /// survives for inspection and its path is logged.
    pub fn finish(self) {
        let RunContext {
            run_id,
            temp,
            keep_temp,
            ..
        } = self;

        if keep_temp {
            let path = temp.keep();
            warn!("run {}: keeping temp dir {}", run_id, path.display());
        } else if let Err(e) = temp.close() {
            warn!("run {}: failed to remove temp dir: {}", run_id, e);
        }
    }
}
