//! Execution step for code running
//!
//! Runs compiled or interpreted programs once against free-form input.

use std::path::Path;

use tracing::{debug, instrument};

use crate::config::Language;
use crate::process::{CommandKind, CommandSpec, ProcessRunner};
use crate::runner::compile::{CompileStep, compile_if_needed};
use crate::runner::{RUN_TIMEOUT, Runner};
use crate::types::{ExecutionOutcome, Submission};
use crate::workspace::Workspace;

/// Run a submission once, feeding it the submission's stdin
///
/// The workspace is released on every path. Stdout and stderr of the
/// returned outcome are trimmed.
#[instrument(skip_all, fields(language = %submission.language.id))]
pub async fn execute_freeform(runner: &Runner, submission: &Submission<'_>) -> ExecutionOutcome {
    let (workspace, source) = match runner.open_workspace(submission).await {
        Ok(opened) => opened,
        Err(outcome) => return outcome.trimmed(),
    };

    let outcome = match compile_if_needed(runner, submission.language, &workspace, &source).await {
        CompileStep::Failed(outcome) => outcome,
        _ => {
            run_program(
                runner.processes(),
                submission.language,
                &workspace,
                &source,
                &submission.stdin,
            )
            .await
        }
    };

    workspace.release().await;
    outcome.trimmed()
}

/// Build the command that runs the program once
///
/// Compiled programs run from the output directory; interpreted ones from
/// the workspace root.
pub(crate) fn run_command(
    language: &Language,
    workspace: &Workspace,
    source: &Path,
    stdin: &str,
) -> CommandSpec {
    let argv = language.run_command(source, workspace.output_dir());
    CommandSpec::new(CommandKind::Run, argv, workspace.run_dir(), RUN_TIMEOUT)
        .stdin(stdin)
        .env("HOME", workspace.path().to_string_lossy())
}

/// Run the program once in an already prepared workspace
pub(crate) async fn run_program(
    processes: &dyn ProcessRunner,
    language: &Language,
    workspace: &Workspace,
    source: &Path,
    stdin: &str,
) -> ExecutionOutcome {
    let command = run_command(language, workspace, source, stdin);
    let outcome = processes.run(&command).await;
    debug!(
        status = %outcome.status,
        exit_code = outcome.exit_code,
        time_ms = outcome.execution_time_ms,
        "program finished"
    );
    outcome
}
