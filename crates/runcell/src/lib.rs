//! A library for compiling and running untrusted code against test cases.
//!
//! Runcell takes a source file in one of a fixed set of languages, runs it in
//! a throwaway workspace directory with a hard wall-clock bound, and reports
//! either the result of a single run or a pass/fail verdict per test case.
//!
//! # Features
//!
//! - **Multi-language** — Compiled and interpreted languages from an embedded registry.
//! - **Scoped workspaces** — One directory per request, removed on every exit path.
//! - **Hard timeouts** — Runaway programs are killed and reported with partial output.
//! - **Test-case harness** — Compile once, run each case in order, compare trimmed output.
//! - **TOML configuration** — Workspace root, concurrency bound and output cap.
//!
//! # Example
//!
//! ```no_run
//! use runcell::{ExecutionRequest, Runner, TestCase};
//!
//! # async fn demo() -> Result<(), runcell::RequestError> {
//! let runner = Runner::with_defaults();
//! let request = ExecutionRequest::new("print(sum(map(int, open(0).read().split())))", "python")
//!     .with_test_cases(vec![TestCase::new("3\n4\n", "7")]);
//! let response = runner.execute(request).await?;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language, LanguageRegistry};
pub use process::{CommandKind, CommandSpec, LocalProcessRunner, ProcessRunner};
pub use runner::{
    COMPILE_TIMEOUT, CompileError, CompileResult, CompileStep, RUN_TIMEOUT, Runner,
    outputs_match,
};
pub use toolchain::{PathLocator, ToolchainLocator};
pub use types::{
    CompilationFailure, ExecutionOutcome, ExecutionRequest, ExecutionResponse, ExecutionStatus,
    ExecutionSummary, FreeformResult, RequestError, Submission, SummaryStatus, TestCase,
    TestCaseReport, TestCaseResult,
};
pub use workspace::{Workspace, WorkspaceError, WorkspaceManager};

pub mod config;
pub mod process;
pub mod runner;
pub mod toolchain;
pub mod types;
pub mod workspace;
