//! Test doubles for the process runner and toolchain locator

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::config::Language;
use crate::process::{CommandKind, CommandSpec, ProcessRunner};
use crate::toolchain::ToolchainLocator;
use crate::types::{ExecutionOutcome, ExecutionStatus};

type Script = Box<dyn Fn(&CommandSpec) -> ExecutionOutcome + Send + Sync>;

/// A process runner that answers from a closure and records every call
pub(crate) struct ScriptedRunner {
    script: Script,
    compile_calls: AtomicUsize,
    run_calls: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

/// What the runner saw for one invocation
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub kind: CommandKind,
    pub argv: Vec<String>,
    pub working_dir: PathBuf,
    pub working_dir_existed: bool,
    pub stdin: String,
}

impl ScriptedRunner {
    pub fn new(script: impl Fn(&CommandSpec) -> ExecutionOutcome + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            compile_calls: AtomicUsize::new(0),
            run_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn compile_calls(&self) -> usize {
        self.compile_calls.load(Ordering::SeqCst)
    }

    pub fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.compile_calls() + self.run_calls()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl std::fmt::Debug for ScriptedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRunner")
            .field("compile_calls", &self.compile_calls())
            .field("run_calls", &self.run_calls())
            .finish()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, command: &CommandSpec) -> ExecutionOutcome {
        match command.kind() {
            CommandKind::Compile => self.compile_calls.fetch_add(1, Ordering::SeqCst),
            CommandKind::Run => self.run_calls.fetch_add(1, Ordering::SeqCst),
        };
        self.calls.lock().unwrap().push(RecordedCall {
            kind: command.kind(),
            argv: command.argv().to_vec(),
            working_dir: command.working_dir().to_path_buf(),
            working_dir_existed: command.working_dir().is_dir(),
            stdin: command.stdin_data().to_owned(),
        });
        (self.script)(command)
    }
}

/// A toolchain locator with a fixed answer
#[derive(Debug)]
pub(crate) struct StaticLocator(bool);

impl StaticLocator {
    pub fn available() -> Self {
        Self(true)
    }

    pub fn unavailable() -> Self {
        Self(false)
    }
}

impl ToolchainLocator for StaticLocator {
    fn is_available(&self, _language: &Language) -> bool {
        self.0
    }
}

/// A successful outcome with the given stdout
pub(crate) fn ok(stdout: &str) -> ExecutionOutcome {
    ExecutionOutcome {
        status: ExecutionStatus::Success,
        stdout: stdout.to_owned(),
        stderr: String::new(),
        exit_code: 0,
        signal: None,
        execution_time_ms: 3,
        memory_used_bytes: 0,
    }
}

/// A failed outcome with the given exit code and stderr
pub(crate) fn exited(code: i32, stderr: &str) -> ExecutionOutcome {
    ExecutionOutcome {
        status: ExecutionStatus::Error,
        stdout: String::new(),
        stderr: stderr.to_owned(),
        exit_code: code,
        signal: None,
        execution_time_ms: 3,
        memory_used_bytes: 0,
    }
}

/// A timed out outcome with partial stdout
pub(crate) fn timed_out(stdout: &str) -> ExecutionOutcome {
    ExecutionOutcome {
        status: ExecutionStatus::Timeout,
        stdout: stdout.to_owned(),
        stderr: "Time Limit Exceeded (5000 ms)".to_owned(),
        exit_code: -1,
        signal: None,
        execution_time_ms: 5000,
        memory_used_bytes: 0,
    }
}
