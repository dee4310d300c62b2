use std::time::{Duration, Instant};

use runcell::{ExecutionRequest, ExecutionStatus, RUN_TIMEOUT, RequestError, SummaryStatus, TestCase};

use super::{
    builtin_runner, expect_compilation_failure, expect_freeform, expect_report,
    leftover_workspaces, shell_runner,
};

const ADD_TWO_LINES: &str = "read a\nread b\necho $((a + b))\n";

#[tokio::test]
async fn test_interpreted_hello() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let response = runner
        .execute(ExecutionRequest::new("echo 'Hello, World!'", "sh"))
        .await
        .expect("request should be valid");
    let result = expect_freeform(response);

    assert!(result.success);
    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.output, "Hello, World!");
    assert_eq!(result.memory_used, 0);
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_stdin_is_delivered() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let request = ExecutionRequest::new(ADD_TWO_LINES, "sh").with_input("3\n4\n");
    let result = expect_freeform(runner.execute(request).await.unwrap());

    assert!(result.success);
    assert_eq!(result.output, "7");
}

#[tokio::test]
async fn test_runtime_error() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let request = ExecutionRequest::new("echo partial\necho 'boom' >&2\nexit 3\n", "sh");
    let result = expect_freeform(runner.execute(request).await.unwrap());

    assert!(!result.success);
    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.output, "partial");
    assert_eq!(result.error, "boom");
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_infinite_loop_times_out() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let request = ExecutionRequest::new("echo started\nwhile :; do :; done\n", "sh");
    let start = Instant::now();
    let result = expect_freeform(runner.execute(request).await.unwrap());
    let elapsed = start.elapsed();

    assert_eq!(result.status, ExecutionStatus::Timeout);
    assert_eq!(result.exit_code, -1);
    assert_eq!(result.output, "started");
    assert!(elapsed >= RUN_TIMEOUT);
    assert!(elapsed < RUN_TIMEOUT + Duration::from_secs(3), "took {elapsed:?}");
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_compiled_pipeline() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let request = ExecutionRequest::new("#!/bin/sh\necho compiled\n", "shc");
    let result = expect_freeform(runner.execute(request).await.unwrap());

    assert!(result.success, "unexpected failure: {}", result.error);
    assert_eq!(result.output, "compiled");
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_compile_error() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let request = ExecutionRequest::new("echo no shebang\n", "shc");
    let failure = expect_compilation_failure(runner.execute(request).await.unwrap());

    assert!(!failure.success);
    assert_eq!(failure.error, "Compilation Error");
    assert_eq!(failure.status, ExecutionStatus::CompilationError);
    assert!(failure.details.contains("missing shebang"), "{}", failure.details);
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_cases_pass_and_fail() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let request = ExecutionRequest::new(ADD_TWO_LINES, "sh").with_test_cases(vec![
        TestCase::new("3\n4\n", "7"),
        TestCase::new("10\n-3\n", "7\n"),
        TestCase::new("1\n1\n", "3"),
    ]);
    let report = expect_report(runner.execute(request).await.unwrap());

    assert!(report.success);
    assert_eq!(report.total_tests, 3);
    assert_eq!(report.passed_tests, 2);
    assert_eq!(report.language, "sh");
    assert!(report.results[0].passed);
    assert!(report.results[1].passed);
    assert!(!report.results[2].passed);
    assert_eq!(report.results[2].actual_output, "2");
    assert_eq!(report.execution_summary.status, SummaryStatus::Partial);
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_cases_with_compiled_program() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let code = format!("#!/bin/sh\n{ADD_TWO_LINES}");
    let request = ExecutionRequest::new(code, "shc")
        .with_test_cases(vec![TestCase::new("1\n2\n", "3"), TestCase::new("5\n5\n", "10")]);
    let report = expect_report(runner.execute(request).await.unwrap());

    assert_eq!(report.passed_tests, 2);
    assert_eq!(report.execution_summary.status, SummaryStatus::AllPassed);
    assert!(report.execution_summary.compilation_time.is_some());
}

#[tokio::test]
async fn test_cases_compile_error() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let request = ExecutionRequest::new("echo no shebang\n", "shc")
        .with_test_cases(vec![TestCase::new("", "x"), TestCase::new("", "y")]);
    let report = expect_report(runner.execute(request).await.unwrap());

    assert!(!report.success);
    assert_eq!(report.passed_tests, 0);
    for result in &report.results {
        assert_eq!(result.status, ExecutionStatus::CompilationError);
        assert!(result.error.contains("missing shebang"));
        assert_eq!(result.actual_output, "");
    }
    assert_eq!(report.execution_summary.status, SummaryStatus::CompilationError);
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    // Both write a file with the same name into their working directory
    let code = "read n\necho $((n * 2)) > scratch.txt\nsleep 1\ncat scratch.txt\n";
    let first = runner.execute(ExecutionRequest::new(code, "sh").with_input("21\n"));
    let second = runner.execute(ExecutionRequest::new(code, "sh").with_input("50\n"));
    let (first, second) = tokio::join!(first, second);

    assert_eq!(expect_freeform(first.unwrap()).output, "42");
    assert_eq!(expect_freeform(second.unwrap()).output, "100");
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_unsupported_language_touches_nothing() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let err = runner
        .execute(ExecutionRequest::new("print(1)", "python"))
        .await
        .unwrap_err();

    assert_eq!(err, RequestError::UnsupportedLanguage("python".into()));
    assert!(!root.path().join("workspaces").exists());
}

#[tokio::test]
async fn test_missing_code_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let runner = builtin_runner(root.path());

    let err = runner
        .execute(ExecutionRequest::new("", "python"))
        .await
        .unwrap_err();

    assert_eq!(err, RequestError::MissingField("code"));
    assert!(!root.path().join("workspaces").exists());
}
