//! Compilation step for code execution
//!
//! Runs the language's compiler inside the workspace and turns its result into
//! either "ready to run" or a compilation error carrying the diagnostic.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Language;
use crate::process::{CommandKind, CommandSpec, ProcessRunner};
use crate::runner::{COMPILE_TIMEOUT, Runner};
use crate::types::ExecutionOutcome;
use crate::workspace::Workspace;

/// Errors that prevent the compiler from being invoked at all
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("language {0} is not compiled")]
    NotCompiled(String),

    #[error("workspace has no output directory")]
    NoOutputDir,
}

/// Result of a compilation
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Whether compilation succeeded
    pub success: bool,

    /// Outcome of the compiler process
    pub outcome: ExecutionOutcome,

    /// Compiler diagnostic (stderr, or stdout when stderr is empty)
    pub output: String,
}

impl CompileResult {
    /// Check if compilation was successful
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Time the compiler took in milliseconds
    pub fn time_ms(&self) -> u64 {
        self.outcome.execution_time_ms
    }

    /// Convert a failed compilation into a `compilation_error` outcome
    pub fn into_failure(self) -> ExecutionOutcome {
        let time = self.time_ms();
        ExecutionOutcome::compilation_error(self.output, time)
    }
}

/// Where a submission stands after the compilation stage
#[derive(Debug)]
pub enum CompileStep {
    /// Interpreted language, nothing was compiled
    Interpreted,

    /// Compiled successfully
    Compiled { time_ms: u64 },

    /// Compilation did not produce a runnable program
    Failed(ExecutionOutcome),
}

impl CompileStep {
    /// Compilation time, if a compiler ran
    pub fn time_ms(&self) -> Option<u64> {
        match self {
            CompileStep::Interpreted => None,
            CompileStep::Compiled { time_ms } => Some(*time_ms),
            CompileStep::Failed(outcome) => Some(outcome.execution_time_ms),
        }
    }
}

/// Compile a source file that has already been written into `workspace`
///
/// A compiler that exits non-zero, is killed, or runs past
/// [`COMPILE_TIMEOUT`] yields an unsuccessful result, not an error.
#[instrument(skip_all, fields(language = %language.id, workspace = %workspace.id()))]
pub async fn compile(
    processes: &dyn ProcessRunner,
    language: &Language,
    workspace: &Workspace,
    source: &Path,
) -> Result<CompileResult, CompileError> {
    if !language.is_compiled() {
        return Err(CompileError::NotCompiled(language.name.clone()));
    }
    let output_dir = workspace.output_dir().ok_or(CompileError::NoOutputDir)?;
    let argv = language
        .compile_command(source, output_dir)
        .ok_or_else(|| CompileError::NotCompiled(language.name.clone()))?;

    let command = CommandSpec::new(CommandKind::Compile, argv, workspace.path(), COMPILE_TIMEOUT)
        .env("HOME", workspace.path().to_string_lossy());
    let outcome = processes.run(&command).await;
    let success = outcome.is_success();

    debug!(
        success,
        exit_code = outcome.exit_code,
        status = %outcome.status,
        time_ms = outcome.execution_time_ms,
        "compilation complete"
    );

    let output = diagnostic(&outcome);
    Ok(CompileResult {
        success,
        outcome,
        output,
    })
}

/// Run the compilation stage if the language needs one
pub(crate) async fn compile_if_needed(
    runner: &Runner,
    language: &Language,
    workspace: &Workspace,
    source: &Path,
) -> CompileStep {
    if !language.is_compiled() {
        return CompileStep::Interpreted;
    }

    match compile(runner.processes(), language, workspace, source).await {
        Ok(result) if result.is_success() => CompileStep::Compiled {
            time_ms: result.time_ms(),
        },
        Ok(result) => CompileStep::Failed(result.into_failure()),
        Err(e) => CompileStep::Failed(ExecutionOutcome::failed(e.to_string(), 0)),
    }
}

fn diagnostic(outcome: &ExecutionOutcome) -> String {
    let stderr = outcome.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_owned();
    }
    let stdout = outcome.stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_owned();
    }
    if outcome.is_success() {
        String::new()
    } else {
        format!("compiler exited with code {}", outcome.exit_code)
    }
}
