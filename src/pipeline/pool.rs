//! Parallel chunk enhancement over a bounded worker pool
//!
//! Tasks are dispatched round-robin to worker threads, each of which runs
//! the enhancer subprocess for its chunk. Results are collected on a shared
//! channel and re-ordered by chunk index, so completion order never leaks
//! into the output. The first real failure aborts the pool: in-flight
//! children are killed through the shared abort token and queued tasks are
//! skipped.

use crate::audio::WavAudio;
use crate::error::{RemasterError, Result};
use crate::progress::{ProgressEvent, ProgressSender};
use crate::run::CancelToken;
use crate::tool::Enhancer;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub struct ChunkTask {
    pub index: usize,
    pub input: PathBuf,
    pub output: PathBuf,
}

struct ChunkOutcome {
    index: usize,
    result: Result<WavAudio>,
}

struct Worker {
    tx: Sender<Option<ChunkTask>>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn new(enhancer: Arc<Enhancer>, out_tx: Sender<ChunkOutcome>, abort: CancelToken) -> Self {
        let (task_tx, task_rx) = channel::<Option<ChunkTask>>();

        let handle = thread::spawn(move || {
            while let Ok(Some(task)) = task_rx.recv() {
                let result = if abort.is_cancelled() {
                    Err(RemasterError::Cancelled)
                } else {
                    let start = Instant::now();
                    let result =
                        enhancer.enhance_chunk(task.index, &task.input, &task.output, &abort);
                    if result.is_ok() {
                        debug!(
                            "chunk {} enhanced in {} ms",
                            task.index,
                            start.elapsed().as_millis()
                        );
                    }
                    result
                };

                let _ = out_tx.send(ChunkOutcome {
                    index: task.index,
                    result,
                });
            }
        });

        Self { tx: task_tx, handle }
    }
}

/// Worker pool for one run. Build it, call [`ChunkPool::run`] once, drop it.
pub struct ChunkPool {
    workers: Vec<Worker>,
    outcome_rx: Receiver<ChunkOutcome>,
    abort: CancelToken,
}

impl ChunkPool {
    pub fn new(enhancer: Arc<Enhancer>, jobs: usize) -> Self {
        let jobs = jobs.max(1);
        let (out_tx, out_rx) = channel::<ChunkOutcome>();
        let abort = CancelToken::new();

        let workers = (0..jobs)
            .map(|_| Worker::new(Arc::clone(&enhancer), out_tx.clone(), abort.clone()))
            .collect();

        Self {
            workers,
            outcome_rx: out_rx,
            abort,
        }
    }

    /// Process every task and return the enhanced chunks sorted by index.
    ///
    /// The first failed chunk fails the whole call; a cancellation through
    /// `cancel` wins over any failure raced against it.
    pub fn run(
        &self,
        tasks: Vec<ChunkTask>,
        cancel: &CancelToken,
        progress: &ProgressSender,
    ) -> Result<Vec<WavAudio>> {
        let total = tasks.len();

        for (i, task) in tasks.into_iter().enumerate() {
            self.workers[i % self.workers.len()]
                .tx
                .send(Some(task))
                .map_err(|_| RemasterError::processing("chunk worker hung up"))?;
        }

        let mut results: Vec<(usize, WavAudio)> = Vec::with_capacity(total);
        let mut first_err: Option<RemasterError> = None;
        let mut user_cancelled = false;
        let mut received = 0usize;

        while received < total {
            if cancel.is_cancelled() && !user_cancelled {
                user_cancelled = true;
                self.abort.cancel();
            }

            match self.outcome_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(outcome) => {
                    received += 1;
                    match outcome.result {
                        Ok(audio) => {
                            if first_err.is_none() && !user_cancelled {
                                progress.emit(ProgressEvent::ChunkFinished {
                                    index: outcome.index,
                                    total,
                                });
                            }
                            results.push((outcome.index, audio));
                        }
                        // Cascade from an abort, not a failure of its own
                        Err(RemasterError::Cancelled) => {}
                        Err(e) => {
                            if first_err.is_none() {
                                first_err = Some(e);
                                self.abort.cancel();
                            }
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(RemasterError::processing("chunk workers disconnected"));
                }
            }
        }

        if user_cancelled {
            return Err(RemasterError::Cancelled);
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, audio)| audio).collect())
    }
}

impl Drop for ChunkPool {
    fn drop(&mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.tx.send(None);
            let _ = worker.handle.join();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, WavAudio};
    use crate::config::ToolsConfig;
    use ndarray::Array1;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    const COPY_STUB: &str = r#"in=""; out=""; prev=""
for a in "$@"; do
  case "$prev" in
    -i) in="$a";;
    -o) out="$a";;
  esac
  prev="$a"
done
cp "$in" "$out""#;

    fn enhancer_with(program: PathBuf) -> Arc<Enhancer> {
        let tools = ToolsConfig {
            enhancer: program,
            ..Default::default()
        };
        Arc::new(Enhancer::new(&tools).unwrap())
    }

    fn chunk_file(dir: &Path, index: usize, value: f32) -> PathBuf {
        let path = dir.join(format!("chunk_{:04}.wav", index));
        let audio = WavAudio::new_mono(
            8000,
            Array1::from(vec![value; 16]),
            AudioFormat::Float32,
        );
        audio.save_to_file(&path).unwrap();
        path
    }

    fn tasks_for(dir: &Path, out_dir: &Path, count: usize) -> Vec<ChunkTask> {
        (0..count)
            .map(|index| ChunkTask {
                index,
                input: chunk_file(dir, index, index as f32 / 10.0),
                output: out_dir.join(format!("enhanced_{:04}.wav", index)),
            })
            .collect()
    }

    #[test]
    fn test_pool_returns_chunks_in_index_order() {
        let dir = TempDir::new().unwrap();
        // First chunks sleep longest so completion order differs from index order
        let stub = write_stub(
            dir.path(),
            "enhancer.sh",
            &format!(
                r#"{}
case "$in" in
  *chunk_0000*) sleep 0.4;;
  *chunk_0001*) sleep 0.2;;
esac"#,
                COPY_STUB
            ),
        );

        let out_dir = dir.path().join("out");
        std::fs::create_dir_all(&out_dir).unwrap();
        let tasks = tasks_for(dir.path(), &out_dir, 4);

        let pool = ChunkPool::new(enhancer_with(stub), 2);
        let results = pool
            .run(tasks, &CancelToken::new(), &ProgressSender::sink())
            .unwrap();

        assert_eq!(results.len(), 4);
        for (index, audio) in results.iter().enumerate() {
            match audio.data() {
                crate::audio::AudioData::Mono(d) => {
                    assert!((d[0] - index as f32 / 10.0).abs() < 1e-4);
                }
                _ => panic!("Expected mono chunk"),
            }
        }
    }

    #[test]
    fn test_pool_aborts_on_first_failure() {
        let dir = TempDir::new().unwrap();
        let stub = write_stub(
            dir.path(),
            "enhancer.sh",
            &format!(
                r#"{}
case "$in" in
  *chunk_0002*) echo "chunk exploded" >&2; exit 7;;
esac"#,
                COPY_STUB
            ),
        );

        let out_dir = dir.path().join("out");
        std::fs::create_dir_all(&out_dir).unwrap();
        let tasks = tasks_for(dir.path(), &out_dir, 4);

        let pool = ChunkPool::new(enhancer_with(stub), 2);
        let err = pool
            .run(tasks, &CancelToken::new(), &ProgressSender::sink())
            .unwrap_err();

        match err {
            RemasterError::Model { unit, reason } => {
                assert_eq!(unit, "chunk 2");
                assert!(reason.contains("chunk exploded"));
            }
            other => panic!("Expected Model error, got {:?}", other),
        }
    }

    #[test]
    fn test_pool_reports_progress_per_chunk() {
        let dir = TempDir::new().unwrap();
        let stub = write_stub(dir.path(), "enhancer.sh", COPY_STUB);

        let out_dir = dir.path().join("out");
        std::fs::create_dir_all(&out_dir).unwrap();
        let tasks = tasks_for(dir.path(), &out_dir, 3);

        let (progress, events) = ProgressSender::channel();
        let pool = ChunkPool::new(enhancer_with(stub), 1);
        pool.run(tasks, &CancelToken::new(), &progress).unwrap();
        drop(progress);

        let finished: Vec<_> = events
            .try_iter()
            .filter(|e| matches!(e, ProgressEvent::ChunkFinished { .. }))
            .collect();
        assert_eq!(finished.len(), 3);
    }

    #[test]
    fn test_pool_honors_cancellation() {
        let dir = TempDir::new().unwrap();
        let stub = write_stub(
            dir.path(),
            "enhancer.sh",
            &format!("{}\nsleep 30", COPY_STUB),
        );

        let out_dir = dir.path().join("out");
        std::fs::create_dir_all(&out_dir).unwrap();
        let tasks = tasks_for(dir.path(), &out_dir, 2);

        let cancel = CancelToken::new();
        let killer = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(300));
                cancel.cancel();
            })
        };

        let start = Instant::now();
        let pool = ChunkPool::new(enhancer_with(stub), 2);
        let err = pool
            .run(tasks, &cancel, &ProgressSender::sink())
            .unwrap_err();
        killer.join().unwrap();

        assert!(matches!(err, RemasterError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
