//! Subprocess execution with timeout and cancellation
//!
//! All external tools run through [`ToolCommand`]: spawn with captured
//! stdio, poll the child against a deadline and a [`CancelToken`], kill it
//! when either trips, and fold a non-zero exit into the error taxonomy with
//! the tail of stderr attached.

use crate::error::{RemasterError, Result};
use crate::run::CancelToken;
use log::debug;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL_CHARS: usize = 400;

/// Locate `program` as an executable file. Bare names are searched on
/// PATH; anything with a directory component is checked directly.
pub fn resolve_program(program: &Path) -> Result<PathBuf> {
    let missing = || RemasterError::MissingTool {
        tool: program.display().to_string(),
    };

    if program.components().count() > 1 {
        return if program.is_file() {
            Ok(program.to_path_buf())
        } else {
            Err(missing())
        };
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(missing())
}

#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// One external tool invocation.
#[derive(Debug)]
pub struct ToolCommand {
    tool: String,
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

enum WaitOutcome {
    Finished(ExitStatus),
    Aborted(RemasterError),
}

impl ToolCommand {
    pub fn new(program: &Path) -> Self {
        let tool = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());

        Self {
            tool,
            program: program.to_path_buf(),
            args: Vec::new(),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn arg<A: AsRef<std::ffi::OsStr>>(mut self, arg: A) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<std::ffi::OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the tool to completion.
    ///
    /// stdout and stderr are drained on reader threads so a chatty child
    /// never blocks on a full pipe while we poll it. On timeout or
    /// cancellation the child is killed and the call returns immediately,
    /// without waiting for the pipes to close.
    pub fn run(&self, cancel: &CancelToken) -> Result<ToolOutput> {
        debug!("running {} {:?}", self.program.display(), self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RemasterError::MissingTool {
                    tool: self.program.display().to_string(),
                },
                _ => RemasterError::Io(e),
            })?;

        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let outcome = loop {
            match child.try_wait() {
                Ok(Some(status)) => break WaitOutcome::Finished(status),
                Ok(None) => {}
                Err(e) => break WaitOutcome::Aborted(e.into()),
            }
            if cancel.is_cancelled() {
                break WaitOutcome::Aborted(RemasterError::Cancelled);
            }
            if Instant::now() >= deadline {
                break WaitOutcome::Aborted(RemasterError::Timeout {
                    tool: self.tool.clone(),
                    seconds: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let status = match outcome {
            WaitOutcome::Finished(status) => status,
            WaitOutcome::Aborted(err) => {
                kill_and_reap(&mut child);
                // Do not join the readers here: a descendant that
                // inherited the pipes can hold the write ends open long
                // after the child is dead, and joining would block until
                // it exits. The detached threads finish once the pipes
                // close.
                return Err(err);
            }
        };

        let stdout = join_reader(stdout_reader);
        let stderr = join_reader(stderr_reader);

        if !status.success() {
            return Err(RemasterError::ToolFailed {
                tool: self.tool.clone(),
                status: status.to_string(),
                stderr: stderr_tail(&stderr),
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Option<thread::JoinHandle<String>> {
    source.map(|mut reader| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Last `STDERR_TAIL_CHARS` characters of a tool's stderr, enough context
/// for an error message without dumping the whole log.
pub fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - STDERR_TAIL_CHARS).collect();
    format!("... {}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_short_passthrough() {
        assert_eq!(stderr_tail("  oops \n"), "oops");
    }

    #[test]
    fn test_stderr_tail_truncates_long_output() {
        let long = "x".repeat(1000);
        let tail = stderr_tail(&long);
        assert!(tail.starts_with("... "));
        assert_eq!(tail.chars().count(), STDERR_TAIL_CHARS + 4);
    }

    #[test]
    fn test_resolve_missing_program() {
        let err = resolve_program(Path::new("no-such-tool-remaster-test")).unwrap_err();
        assert!(matches!(err, RemasterError::MissingTool { .. }));

        let err = resolve_program(Path::new("/no/such/dir/tool")).unwrap_err();
        assert!(matches!(err, RemasterError::MissingTool { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_program_on_path() {
        let sh = resolve_program(Path::new("sh")).unwrap();
        assert!(sh.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_stdout() {
        let out = ToolCommand::new(Path::new("/bin/sh"))
            .args(["-c", "echo hello"])
            .run(&CancelToken::new())
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_surfaces_nonzero_exit() {
        let err = ToolCommand::new(Path::new("/bin/sh"))
            .args(["-c", "echo broken >&2; exit 3"])
            .run(&CancelToken::new())
            .unwrap_err();

        match err {
            RemasterError::ToolFailed { tool, status, stderr } => {
                assert_eq!(tool, "sh");
                assert!(status.contains('3'));
                assert!(stderr.contains("broken"));
            }
            other => panic!("Expected ToolFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_enforces_timeout() {
        let start = Instant::now();
        let err = ToolCommand::new(Path::new("/bin/sh"))
            .args(["-c", "sleep 30"])
            .timeout(Duration::from_millis(200))
            .run(&CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, RemasterError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_honors_cancellation() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let start = Instant::now();
        let err = ToolCommand::new(Path::new("/bin/sh"))
            .args(["-c", "sleep 30"])
            .run(&cancel)
            .unwrap_err();

        assert!(matches!(err, RemasterError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_returns_despite_surviving_grandchild() {
        // The background sleep inherits the pipes and outlives the shell;
        // run() must not wait for it to exit.
        let start = Instant::now();
        let err = ToolCommand::new(Path::new("/bin/sh"))
            .args(["-c", "sleep 20 & exec sleep 60"])
            .timeout(Duration::from_millis(300))
            .run(&CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, RemasterError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_returns_despite_surviving_grandchild() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let start = Instant::now();
        let err = ToolCommand::new(Path::new("/bin/sh"))
            .args(["-c", "sleep 20 & exec sleep 60"])
            .run(&cancel)
            .unwrap_err();

        assert!(matches!(err, RemasterError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_missing_program() {
        let err = ToolCommand::new(Path::new("/no/such/remaster-tool"))
            .run(&CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, RemasterError::MissingTool { .. }));
    }
}
