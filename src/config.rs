//! Configuration management for the remaster pipeline

use crate::error::{RemasterError, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub audio: AudioConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// ffmpeg binary, as a bare name looked up on PATH or a full path.
    pub ffmpeg: PathBuf,
    /// Enhancement model CLI invoked once per chunk.
    pub enhancer: PathBuf,
    /// Extra arguments passed to the enhancer ahead of -i/-o.
    pub enhancer_args: Vec<String>,
    /// Separation model CLI invoked once per input file.
    pub separator: PathBuf,
    /// Model name handed to the separator via -n.
    pub separator_model: String,
    pub ffmpeg_timeout_secs: u64,
    pub model_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Maximum chunk duration for the upscale pipeline.
    pub chunk_seconds: f64,
    /// Downmix stereo input to mono before enhancement.
    pub downmix: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Parallel chunk workers for the upscale pipeline.
    pub jobs: usize,
    /// Keep the run's temporary directory instead of deleting it.
    pub keep_temp: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolsConfig::default(),
            audio: AudioConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            enhancer: PathBuf::from("audiosr"),
            enhancer_args: Vec::new(),
            separator: PathBuf::from("demucs"),
            separator_model: "htdemucs".to_string(),
            ffmpeg_timeout_secs: 120,
            model_timeout_secs: 900,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_seconds: 10.0,
            downmix: true,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            keep_temp: false,
            verbose: false,
        }
    }
}

impl ToolsConfig {
    pub fn ffmpeg_timeout(&self) -> Duration {
        Duration::from_secs(self.ffmpeg_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

impl Config {
    /// Get chunk duration (convenience method)
    pub fn chunk_seconds(&self) -> f64 {
        self.audio.chunk_seconds
    }

    /// Get worker count (convenience method)
    pub fn jobs(&self) -> usize {
        self.run.jobs
    }

    /// Get verbose mode (convenience method)
    pub fn verbose(&self) -> bool {
        self.run.verbose
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "remaster",
    about = "Audio upscaling and stem separation via external model tools",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short = 'c', long = "config", global = true, help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", global = true, help = "Enable verbose output mode")]
    pub verbose: bool,

    #[arg(long = "keep-temp", global = true, help = "Keep the run's temporary directory")]
    pub keep_temp: bool,

    #[arg(short = 'j', long = "jobs", global = true, help = "Parallel chunk workers")]
    pub jobs: Option<usize>,

    #[arg(long = "ffmpeg", global = true, help = "ffmpeg binary (name or path)")]
    pub ffmpeg: Option<PathBuf>,

    #[arg(long = "enhancer", global = true, help = "Enhancement model binary (name or path)")]
    pub enhancer: Option<PathBuf>,

    #[arg(long = "separator", global = true, help = "Separation model binary (name or path)")]
    pub separator: Option<PathBuf>,

    #[arg(long = "ffmpeg-timeout", global = true, help = "ffmpeg timeout in seconds")]
    pub ffmpeg_timeout: Option<u64>,

    #[arg(long = "model-timeout", global = true, help = "Model tool timeout in seconds")]
    pub model_timeout: Option<u64>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Upscale an audio file with the external enhancement model
    Upscale {
        #[arg(short = 'i', long = "input", help = "Input media file")]
        input: PathBuf,

        #[arg(short = 'o', long = "output-dir", default_value = ".", help = "Output directory")]
        output_dir: PathBuf,

        #[arg(long = "chunk-seconds", help = "Maximum chunk duration in seconds")]
        chunk_seconds: Option<f64>,
    },

    /// Separate an audio file into stems and mix them back into one track
    Separate {
        #[arg(short = 'i', long = "input", help = "Input media file")]
        input: PathBuf,

        #[arg(short = 'o', long = "output-dir", default_value = ".", help = "Output directory")]
        output_dir: PathBuf,

        #[arg(short = 'n', long = "model", help = "Separation model name")]
        model: Option<String>,
    },

    /// Move the metadata atom of an MP4 file to the front (faststart)
    Repair {
        #[arg(short = 'i', long = "input", help = "Input MP4 file")]
        input: PathBuf,

        #[arg(short = 'o', long = "output", help = "Repaired output file")]
        output: PathBuf,
    },

    /// Write a default config file
    InitConfig {
        #[arg(help = "Destination path for the TOML config")]
        path: PathBuf,
    },
}

impl Config {
    /// Create config from command line arguments and config file
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        // First load config file (if provided)
        let mut config = if let Some(config_path) = &cli.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        if let Some(ffmpeg) = &cli.ffmpeg {
            config.tools.ffmpeg = ffmpeg.clone();
        }
        if let Some(enhancer) = &cli.enhancer {
            config.tools.enhancer = enhancer.clone();
        }
        if let Some(separator) = &cli.separator {
            config.tools.separator = separator.clone();
        }
        if let Some(secs) = cli.ffmpeg_timeout {
            config.tools.ffmpeg_timeout_secs = secs;
        }
        if let Some(secs) = cli.model_timeout {
            config.tools.model_timeout_secs = secs;
        }
        if let Some(jobs) = cli.jobs {
            config.run.jobs = jobs;
        }
        if cli.verbose {
            config.run.verbose = true;
        }
        if cli.keep_temp {
            config.run.keep_temp = true;
        }

        match &cli.command {
            Command::Upscale { chunk_seconds, .. } => {
                if let Some(secs) = chunk_seconds {
                    config.audio.chunk_seconds = *secs;
                }
            }
            Command::Separate { model, .. } => {
                if let Some(model) = model {
                    config.tools.separator_model = model.clone();
                }
            }
            _ => {}
        }

        // Validate config
        config.validate()?;

        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RemasterError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| RemasterError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        // Validate chunk duration
        if !self.audio.chunk_seconds.is_finite() || self.audio.chunk_seconds <= 0.0 {
            return Err(RemasterError::config("Chunk duration must be greater than 0"));
        }
        if self.audio.chunk_seconds > 3600.0 {
            return Err(RemasterError::config("Chunk duration cannot exceed 3600 s"));
        }

        // Validate worker count
        if self.run.jobs == 0 {
            return Err(RemasterError::config("Worker count must be greater than 0"));
        }
        if self.run.jobs > num_cpus::get() * 2 {
            return Err(RemasterError::config(
                "Worker count cannot exceed 2x logical CPU cores",
            ));
        }

        // Validate timeouts
        if self.tools.ffmpeg_timeout_secs == 0 || self.tools.model_timeout_secs == 0 {
            return Err(RemasterError::config("Tool timeouts must be at least 1 s"));
        }

        // Validate tool names
        if self.tools.ffmpeg.as_os_str().is_empty()
            || self.tools.enhancer.as_os_str().is_empty()
            || self.tools.separator.as_os_str().is_empty()
        {
            return Err(RemasterError::config("Tool binaries cannot be empty"));
        }
        if self.tools.separator_model.is_empty() {
            return Err(RemasterError::config("Separator model name cannot be empty"));
        }

        Ok(())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RemasterError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| RemasterError::config(format!("Failed to write config file: {}", e)))
    }
}
