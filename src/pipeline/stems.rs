//! Locating the stem files a separation run produced
//!
//! Separators write their stems into a directory tree they control. The
//! [`StemLocator`] trait hides that layout from the pipeline so the lookup
//! can be exercised against plain fixture directories in tests.

use crate::error::{RemasterError, Result};
use std::path::{Path, PathBuf};

/// Stem names every separation must produce, in mix order.
pub const EXPECTED_STEMS: [&str; 4] = ["vocals", "drums", "bass", "other"];

/// The resolved path of every expected stem.
#[derive(Debug, Clone)]
pub struct StemSet {
    stems: Vec<(String, PathBuf)>,
}

impl StemSet {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.stems
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.stems
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, path)| path.as_path())
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }
}

pub trait StemLocator {
    /// Find every expected stem for `track`, failing if any is absent.
    fn locate(&self, track: &str) -> Result<StemSet>;
}

/// Locator for the `<root>/<model>/<track>/<stem>.wav` layout used by
/// demucs-style separators.
pub struct DirectoryStemLocator {
    root: PathBuf,
    model: String,
}

impl DirectoryStemLocator {
    pub fn new(root: &Path, model: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            model: model.to_string(),
        }
    }

    fn track_dir(&self, track: &str) -> PathBuf {
        self.root.join(&self.model).join(track)
    }
}

impl StemLocator for DirectoryStemLocator {
    fn locate(&self, track: &str) -> Result<StemSet> {
        let dir = self.track_dir(track);
        let mut stems = Vec::with_capacity(EXPECTED_STEMS.len());
        let mut missing = Vec::new();

        for name in EXPECTED_STEMS {
            let path = dir.join(format!("{}.wav", name));
            if path.is_file() {
                stems.push((name.to_string(), path));
            } else {
                missing.push(name.to_string());
            }
        }

        if !missing.is_empty() {
            return Err(RemasterError::StemMissing { missing });
        }

        Ok(StemSet { stems })
    }
}
