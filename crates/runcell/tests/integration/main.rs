//! Integration tests for runcell
//!
//! The shell pipeline tests only need `/bin/sh` and run everywhere. Tests
//! against the real language toolchains (python3, node, gcc, g++, javac)
//! are behind a feature:
//!    cargo test -p runcell --features toolchain-tests

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use runcell::{
    CompilationFailure, Config, ExecutionResponse, FreeformResult, LanguageRegistry, Runner,
    TestCaseReport,
};

mod config_loading;
mod shell_pipeline;
#[cfg(feature = "toolchain-tests")]
mod toolchains;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Languages that need nothing but `sh`
static SHELL_LANGUAGES: LazyLock<LanguageRegistry> = LazyLock::new(|| {
    let content = fs::read_to_string(format!("{FIXTURES_PATH}/languages/shell.toml"))
        .expect("Failed to read shell language fixture");
    LanguageRegistry::parse_toml(&content).expect("Failed to parse shell language fixture")
});

/// Helper to get fixture file content
#[cfg_attr(not(feature = "toolchain-tests"), allow(dead_code))]
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// A config whose workspaces live under `root`
pub(crate) fn test_config(root: &Path) -> Config {
    Config {
        workspace_root: root.join("workspaces"),
        max_concurrent_executions: 4,
        ..Config::default()
    }
}

/// A runner over the built-in languages
pub(crate) fn builtin_runner(root: &Path) -> Runner {
    Runner::new(&test_config(root))
}

/// A runner over the shell-only languages
pub(crate) fn shell_runner(root: &Path) -> Runner {
    Runner::new(&test_config(root)).with_registry(&SHELL_LANGUAGES)
}

/// Number of entries left in the workspace root (0 if it was never created)
pub(crate) fn leftover_workspaces(root: &Path) -> usize {
    match fs::read_dir(root.join("workspaces")) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

pub(crate) fn expect_freeform(response: ExecutionResponse) -> FreeformResult {
    match response {
        ExecutionResponse::Freeform(result) => result,
        other => panic!("expected free-form result, got {other:?}"),
    }
}

pub(crate) fn expect_compilation_failure(response: ExecutionResponse) -> CompilationFailure {
    match response {
        ExecutionResponse::CompilationFailed(failure) => failure,
        other => panic!("expected compilation failure, got {other:?}"),
    }
}

pub(crate) fn expect_report(response: ExecutionResponse) -> TestCaseReport {
    match response {
        ExecutionResponse::TestCases(report) => report,
        other => panic!("expected test-case report, got {other:?}"),
    }
}
