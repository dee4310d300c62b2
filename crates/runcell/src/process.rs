//! Process spawning with a hard wall-clock bound
//!
//! A [`ProcessRunner`] runs exactly one child per call and always resolves to
//! an [`ExecutionOutcome`]: spawn failures, non-zero exits, signals and
//! timeouts are all reported as data, never as errors.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::config::DEFAULT_MAX_OUTPUT_BYTES;
use crate::types::{ExecutionOutcome, ExecutionStatus};

/// How long output pipes may stay open after the child is gone
///
/// A grandchild that inherited stdout can hold the pipe open indefinitely;
/// after this grace period the reader is abandoned with what it has.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Appended to a stream that hit the capture cap
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Appended to stderr when the time bound fires
pub const TIMEOUT_MESSAGE: &str = "Time Limit Exceeded";

/// Which pipeline stage a command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Compile,
    Run,
}

/// Builder for one process invocation
#[derive(Debug, Clone)]
pub struct CommandSpec {
    kind: CommandKind,
    argv: Vec<String>,
    working_dir: PathBuf,
    stdin: String,
    timeout: Duration,
    env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a new command
    pub fn new(
        kind: CommandKind,
        argv: impl IntoIterator<Item = impl Into<String>>,
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            kind,
            argv: argv.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
            stdin: String::new(),
            timeout,
            env: Vec::new(),
        }
    }

    /// Set the text fed to the child's standard input
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = input.into();
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn stdin_data(&self) -> &str {
        &self.stdin
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Runs one child process to completion or forced termination
#[async_trait]
pub trait ProcessRunner: Send + Sync + std::fmt::Debug {
    async fn run(&self, command: &CommandSpec) -> ExecutionOutcome;
}

/// Runs commands as direct children of this process
///
/// The child gets a cleared environment: `PATH` is passed through and only
/// the variables set on the [`CommandSpec`] are added. On Unix each child
/// leads a new process group, which is killed as a whole once the child
/// exits or times out. This is process-level isolation only: CPU, memory,
/// network and filesystem access are not restricted beyond the service's
/// own privileges.
#[derive(Debug, Clone)]
pub struct LocalProcessRunner {
    max_output_bytes: usize,
}

impl LocalProcessRunner {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }
}

impl Default for LocalProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

#[async_trait]
impl ProcessRunner for LocalProcessRunner {
    #[instrument(skip(self, command), fields(kind = ?command.kind, program = command.argv.first().map(String::as_str)))]
    async fn run(&self, command: &CommandSpec) -> ExecutionOutcome {
        let Some((program, args)) = command.argv.split_first() else {
            return ExecutionOutcome::failed("empty command", 0);
        };

        let mut process = Command::new(program);
        process
            .args(args)
            .current_dir(&command.working_dir)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own group, so a timeout reaches everything the program forked
        #[cfg(unix)]
        process.process_group(0);
        if let Ok(path) = std::env::var("PATH") {
            process.env("PATH", path);
        }
        for (key, value) in &command.env {
            process.env(key, value);
        }

        let started = Instant::now();
        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, "failed to spawn process");
                return ExecutionOutcome::failed(
                    format!("failed to start '{program}': {e}"),
                    elapsed_ms(started),
                );
            }
        };
        let group = child.id();

        let stdin_task = child.stdin.take().map(|mut pipe| {
            let data = command.stdin.clone().into_bytes();
            tokio::spawn(async move {
                if !data.is_empty()
                    && let Err(e) = pipe.write_all(&data).await
                {
                    // The child may exit without reading its input
                    debug!(error = %e, "stdin write stopped early");
                }
                // Dropping the pipe closes it so the child sees end-of-input
            })
        });
        let stdout = child
            .stdout
            .take()
            .map(|pipe| StreamCapture::spawn(pipe, self.max_output_bytes));
        let stderr = child
            .stderr
            .take()
            .map(|pipe| StreamCapture::spawn(pipe, self.max_output_bytes));

        let waited = tokio::time::timeout(command.timeout, child.wait()).await;
        let exit = match waited {
            Ok(Ok(status)) => {
                // Background children do not outlive the program either
                kill_group(group);
                Exit::Exited(status)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to wait for process");
                terminate(&mut child, group).await;
                Exit::WaitFailed(e.to_string())
            }
            Err(_) => {
                terminate(&mut child, group).await;
                Exit::TimedOut
            }
        };
        let execution_time_ms = elapsed_ms(started);

        if let Some(task) = stdin_task {
            task.abort();
        }
        let stdout = match stdout {
            Some(capture) => capture.finish().await,
            None => String::new(),
        };
        let stderr = match stderr {
            Some(capture) => capture.finish().await,
            None => String::new(),
        };

        let outcome = exit.into_outcome(stdout, stderr, execution_time_ms, command.timeout);
        debug!(
            status = %outcome.status,
            exit_code = outcome.exit_code,
            signal = outcome.signal,
            time_ms = outcome.execution_time_ms,
            "process finished"
        );
        outcome
    }
}

/// SIGKILL the child's process group, then kill and reap the child itself
///
/// The direct kill covers a child that moved itself out of its group.
async fn terminate(child: &mut Child, group: Option<u32>) {
    kill_group(group);
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill process");
    }
}

/// Send SIGKILL to every process left in the group led by `group`
#[cfg(unix)]
fn kill_group(group: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = group else {
        return;
    };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        // Nothing left in the group
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(error = %e, pid, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_group: Option<u32>) {}

/// How a child process resolved
#[derive(Debug)]
enum Exit {
    Exited(ExitStatus),
    TimedOut,
    WaitFailed(String),
}

impl Exit {
    fn into_outcome(
        self,
        stdout: String,
        stderr: String,
        execution_time_ms: u64,
        timeout: Duration,
    ) -> ExecutionOutcome {
        let mut outcome = ExecutionOutcome {
            status: ExecutionStatus::Error,
            stdout,
            stderr,
            exit_code: -1,
            signal: None,
            execution_time_ms,
            memory_used_bytes: 0,
        };

        match self {
            Exit::Exited(status) => {
                if let Some(code) = status.code() {
                    outcome.exit_code = code;
                    if code == 0 {
                        outcome.status = ExecutionStatus::Success;
                    }
                } else {
                    outcome.signal = exit_signal(&status);
                    if outcome.stderr.is_empty()
                        && let Some(signal) = outcome.signal
                    {
                        outcome.stderr = format!("terminated by signal {signal}");
                    }
                }
            }
            Exit::TimedOut => {
                outcome.status = ExecutionStatus::Timeout;
                append_line(
                    &mut outcome.stderr,
                    &format!("{TIMEOUT_MESSAGE} ({} ms)", timeout.as_millis()),
                );
            }
            Exit::WaitFailed(message) => {
                append_line(&mut outcome.stderr, &format!("failed to wait for process: {message}"));
            }
        }
        outcome
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

fn append_line(buffer: &mut String, line: &str) {
    if !buffer.is_empty() && !buffer.ends_with('\n') {
        buffer.push('\n');
    }
    buffer.push_str(line);
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Bytes captured from one stream
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Captured {
    fn push(&mut self, chunk: &[u8], cap: usize) {
        let room = cap.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn into_string(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Background reader for one child output pipe
///
/// Keeps reading past the cap (discarding the excess) so a chatty child never
/// blocks on a full pipe.
#[derive(Debug)]
struct StreamCapture {
    sink: Arc<Mutex<Captured>>,
    task: JoinHandle<()>,
}

impl StreamCapture {
    fn spawn<R>(mut pipe: R, cap: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = Arc::new(Mutex::new(Captured::default()));
        let writer = Arc::clone(&sink);
        let task = tokio::spawn(async move {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => writer
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(&chunk[..n], cap),
                    Err(e) => {
                        debug!(error = %e, "output read failed");
                        break;
                    }
                }
            }
        });
        Self { sink, task }
    }

    /// Wait briefly for end-of-stream, then return whatever was captured
    async fn finish(mut self) -> String {
        if tokio::time::timeout(DRAIN_GRACE, &mut self.task).await.is_err() {
            warn!("output pipe still open after process exit, abandoning reader");
            self.task.abort();
        }
        let captured = std::mem::take(&mut *self.sink.lock().unwrap_or_else(PoisonError::into_inner));
        captured.into_string()
    }
}
