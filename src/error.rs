//! Error types for the remaster pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum RemasterError {
    #[error("conversion of {path:?} failed: {reason}")]
    Conversion { path: PathBuf, reason: String },

    #[error("faststart repair of {path:?} failed: {reason}")]
    Repair { path: PathBuf, reason: String },

    #[error("{path:?} contains no audio samples")]
    EmptyInput { path: PathBuf },

    #[error("model failed on {unit}: {reason}")]
    Model { unit: String, reason: String },

    #[error("separation did not produce stems: {}", .missing.join(", "))]
    StemMissing { missing: Vec<String> },

    #[error("cannot mix stems: {reason}")]
    MixMismatch { reason: String },

    #[error("'{tool}' did not finish within {seconds} s")]
    Timeout { tool: String, seconds: u64 },

    #[error("required tool '{tool}' was not found")]
    MissingTool { tool: String },

    #[error("'{tool}' failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("audio error: {0}")]
    Audio(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("processing error: {0}")]
    Processing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RemasterError {
    pub fn audio<S: Into<String>>(msg: S) -> Self {
        Self::Audio(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    pub fn model<U: Into<String>, S: Into<String>>(unit: U, reason: S) -> Self {
        Self::Model {
            unit: unit.into(),
            reason: reason.into(),
        }
    }

    pub fn model_chunk<S: Into<String>>(index: usize, reason: S) -> Self {
        Self::model(format!("chunk {}", index), reason)
    }

    /// Wrap a failure with stage context. Errors that already identify the
    /// failure precisely (timeout, missing tool, cancellation) keep their
    /// identity instead of being re-wrapped.
    pub fn with_stage<F>(self, wrap: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        match self {
            e @ (Self::Timeout { .. } | Self::MissingTool { .. } | Self::Cancelled) => e,
            other => wrap(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, RemasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = RemasterError::audio("bad header");
        assert!(e.to_string().contains("audio"));

        let e = RemasterError::model_chunk(3, "exit status: 1");
        assert!(e.to_string().contains("chunk 3"));

        let e = RemasterError::StemMissing {
            missing: vec!["drums".into(), "bass".into()],
        };
        assert!(e.to_string().contains("drums, bass"));
    }

    #[test]
    fn test_with_stage_wraps_tool_failures() {
        let e = RemasterError::ToolFailed {
            tool: "ffmpeg".into(),
            status: "exit status: 1".into(),
            stderr: "boom".into(),
        };
        let wrapped = e.with_stage(|e| RemasterError::Conversion {
            path: PathBuf::from("in.mp3"),
            reason: e.to_string(),
        });
        assert!(matches!(wrapped, RemasterError::Conversion { .. }));
    }

    #[test]
    fn test_with_stage_keeps_identity() {
        let e = RemasterError::Timeout {
            tool: "demucs".into(),
            seconds: 900,
        };
        let wrapped = e.with_stage(|e| RemasterError::Model {
            unit: "separation".into(),
            reason: e.to_string(),
        });
        assert!(matches!(wrapped, RemasterError::Timeout { .. }));

        let e = RemasterError::Cancelled;
        assert!(matches!(
            e.with_stage(|e| RemasterError::Audio(e.to_string())),
            RemasterError::Cancelled
        ));
    }
}
