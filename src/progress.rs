//! Progress reporting for pipeline runs
//!
//! A run emits a stream of [`ProgressEvent`]s over a channel: one
//! `StageStarted` per stage transition, `ChunkFinished` per fully enhanced
//! chunk, and exactly one terminal `Completed` or `Failed`. The bundled CLI
//! drains the channel on its main thread; any other front end can attach
//! the same way.

use log::{error, info};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Chunk,
    Enhance,
    Separate,
    Recombine,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Chunk => "chunk",
            Stage::Enhance => "enhance",
            Stage::Separate => "separate",
            Stage::Recombine => "recombine",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StageStarted { stage: Stage },
    ChunkFinished { index: usize, total: usize },
    Completed { output: PathBuf },
    Failed { message: String },
}

/// Channel-backed event reporter.
///
/// Events are mirrored to the log facade. A hung-up receiver is not an
/// error; the pipeline keeps running and events are dropped.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Sender<ProgressEvent>,
}

impl ProgressSender {
    pub fn channel() -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = channel();
        (Self { tx }, rx)
    }

    /// Reporter that drops every event, for callers without a front end.
    pub fn sink() -> Self {
        Self::channel().0
    }

    pub fn emit(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::StageStarted { stage } => info!("stage started: {}", stage.label()),
            ProgressEvent::ChunkFinished { index, total } => {
                info!("chunk {}/{} finished", index + 1, total)
            }
            ProgressEvent::Completed { output } => info!("completed: {}", output.display()),
            ProgressEvent::Failed { message } => error!("failed: {}", message),
        }
        let _ = self.tx.send(event);
    }

    pub fn stage(&self, stage: Stage) {
        self.emit(ProgressEvent::StageStarted { stage });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::Normalize.label(), "normalize");
        assert_eq!(Stage::Recombine.label(), "recombine");
    }

    #[test]
    fn test_events_arrive_in_order() {
        let (sender, rx) = ProgressSender::channel();
        sender.stage(Stage::Normalize);
        sender.emit(ProgressEvent::ChunkFinished { index: 0, total: 2 });
        sender.emit(ProgressEvent::Completed {
            output: PathBuf::from("out.wav"),
        });

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            ProgressEvent::StageStarted {
                stage: Stage::Normalize
            }
        );
        assert!(matches!(events[2], ProgressEvent::Completed { .. }));
    }

    #[test]
    fn test_sink_discards_without_panic() {
        let sender = ProgressSender::sink();
        sender.stage(Stage::Enhance);
        sender.emit(ProgressEvent::Failed {
            message: "nope".into(),
        });
    }
}
