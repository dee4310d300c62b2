//! Code runner for runcell
//!
//! Provides the high-level API: validate a request, then either run the
//! program once against free-form input or run it against every test case.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

pub use crate::runner::compile::{CompileError, CompileResult, CompileStep, compile};
pub use crate::runner::execute::execute_freeform;
pub use crate::runner::harness::{execute_test_cases, outputs_match};

mod compile;
mod execute;
mod harness;
#[cfg(test)]
pub(crate) mod testing;

use crate::{
    config::{Config, LanguageRegistry},
    process::{LocalProcessRunner, ProcessRunner},
    toolchain::{PathLocator, ToolchainLocator},
    types::{ExecutionOutcome, ExecutionRequest, ExecutionResponse, RequestError, Submission},
    workspace::{Workspace, WorkspaceManager},
};

/// Wall-clock bound for one program run
pub const RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// Wall-clock bound for one compilation
pub const COMPILE_TIMEOUT: Duration = Duration::from_secs(10);

/// High-level runner for code execution
///
/// Cheap to clone; clones share the workspace concurrency bound.
#[derive(Debug, Clone)]
pub struct Runner {
    registry: &'static LanguageRegistry,
    workspaces: WorkspaceManager,
    processes: Arc<dyn ProcessRunner>,
    toolchains: Arc<dyn ToolchainLocator>,
}

impl Runner {
    /// Create a runner that spawns local processes according to `config`
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            WorkspaceManager::from_config(config),
            Arc::new(LocalProcessRunner::new(config.max_output_bytes)),
            Arc::new(PathLocator),
        )
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self::new(&Config::default())
    }

    /// Create a runner from explicit collaborators
    pub fn with_parts(
        workspaces: WorkspaceManager,
        processes: Arc<dyn ProcessRunner>,
        toolchains: Arc<dyn ToolchainLocator>,
    ) -> Self {
        Self {
            registry: LanguageRegistry::builtin(),
            workspaces,
            processes,
            toolchains,
        }
    }

    /// Replace the language registry
    pub fn with_registry(mut self, registry: &'static LanguageRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &'static LanguageRegistry {
        self.registry
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    pub fn toolchains(&self) -> &dyn ToolchainLocator {
        self.toolchains.as_ref()
    }

    pub(crate) fn processes(&self) -> &dyn ProcessRunner {
        self.processes.as_ref()
    }

    /// Validate a request and run it in the mode it asks for
    ///
    /// # Errors
    ///
    /// Only request validation fails; every execution failure is reported
    /// inside the returned response.
    #[instrument(skip_all, fields(language = request.language.as_deref()))]
    pub async fn execute(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionResponse, RequestError> {
        let submission = request.validate(self.registry).inspect_err(|e| {
            info!(error = %e, "rejected request");
        })?;
        let language = submission.language.id.clone();

        if submission.has_test_cases() {
            let report = self.execute_test_cases(&submission).await;
            info!(
                language,
                total = report.total_tests,
                passed = report.passed_tests,
                "test cases complete"
            );
            Ok(ExecutionResponse::TestCases(report))
        } else {
            let outcome = self.execute_freeform(&submission).await;
            info!(
                language,
                status = %outcome.status,
                time_ms = outcome.execution_time_ms,
                "execution complete"
            );
            Ok(ExecutionResponse::from_outcome(outcome, &language))
        }
    }

    /// Run a submission once against its stdin
    pub async fn execute_freeform(&self, submission: &Submission<'_>) -> ExecutionOutcome {
        execute::execute_freeform(self, submission).await
    }

    /// Run a submission against each of its test cases
    pub async fn execute_test_cases(&self, submission: &Submission<'_>) -> crate::TestCaseReport {
        harness::execute_test_cases(self, submission).await
    }

    /// Check the toolchain, acquire a workspace and write the source into it
    ///
    /// On failure returns the `error` outcome to report; nothing is left on disk.
    pub(crate) async fn open_workspace(
        &self,
        submission: &Submission<'_>,
    ) -> Result<(Workspace, PathBuf), ExecutionOutcome> {
        let language = submission.language;
        if !self.toolchains.is_available(language) {
            warn!(language = %language.id, "toolchain not available");
            return Err(ExecutionOutcome::failed(
                format!("toolchain for {} is not available on this host", language.name),
                0,
            ));
        }

        let workspace = self.workspaces.acquire(language).await.map_err(|e| {
            warn!(error = %e, "failed to acquire workspace");
            ExecutionOutcome::failed(format!("failed to prepare workspace: {e}"), 0)
        })?;

        match workspace
            .write_file(&language.source_name(), submission.code.as_bytes())
            .await
        {
            Ok(source) => Ok((workspace, source)),
            Err(e) => {
                warn!(error = %e, "failed to write source");
                workspace.release().await;
                Err(ExecutionOutcome::failed(
                    format!("failed to write source: {e}"),
                    0,
                ))
            }
        }
    }
}
