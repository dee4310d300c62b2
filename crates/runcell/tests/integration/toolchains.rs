//! End-to-end runs against the real language toolchains

use runcell::{ExecutionRequest, ExecutionStatus, LanguageRegistry, SummaryStatus, TestCase};

use super::{
    builtin_runner, expect_compilation_failure, expect_freeform, expect_report, fixture_source,
    leftover_workspaces,
};

async fn assert_hello(language: &str, fixture: &str) {
    let root = tempfile::tempdir().unwrap();
    let runner = builtin_runner(root.path());

    let request = ExecutionRequest::new(fixture_source(fixture), language);
    let result = expect_freeform(runner.execute(request).await.unwrap());

    assert!(result.success, "{language} failed: {}", result.error);
    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.output, "Hello, World!");
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_python_hello() {
    assert_hello("python", "hello.py").await;
}

#[tokio::test]
async fn test_javascript_hello() {
    assert_hello("javascript", "hello.js").await;
}

#[tokio::test]
async fn test_c_hello() {
    assert_hello("c", "hello.c").await;
}

#[tokio::test]
async fn test_cpp_hello() {
    assert_hello("cpp", "hello.cpp").await;
}

#[tokio::test]
async fn test_java_hello() {
    assert_hello("java", "Main.java").await;
}

#[test]
fn test_builtin_language_ids() {
    let ids: Vec<_> = LanguageRegistry::builtin().ids().collect();
    assert_eq!(ids, ["c", "cpp", "java", "javascript", "python"]);
}

#[tokio::test]
async fn test_python_sum_cases() {
    let root = tempfile::tempdir().unwrap();
    let runner = builtin_runner(root.path());

    let request = ExecutionRequest::new(fixture_source("sum.py"), "python")
        .with_test_cases(vec![TestCase::new("3\n4\n", "7"), TestCase::new("1 2 3", "6")]);
    let report = expect_report(runner.execute(request).await.unwrap());

    assert!(report.success);
    assert_eq!(report.passed_tests, 2);
    assert_eq!(report.execution_summary.status, SummaryStatus::AllPassed);
}

#[tokio::test]
async fn test_cpp_sum_cases() {
    let root = tempfile::tempdir().unwrap();
    let runner = builtin_runner(root.path());

    let request = ExecutionRequest::new(fixture_source("sum.cpp"), "cpp").with_test_cases(vec![
        TestCase::new("3\n4\n", "7"),
        TestCase::new("-5 5", "0"),
        TestCase::new("2 2", "5"),
    ]);
    let report = expect_report(runner.execute(request).await.unwrap());

    assert_eq!(report.passed_tests, 2);
    assert!(!report.results[2].passed);
    assert_eq!(report.results[2].actual_output, "4");
    assert!(report.execution_summary.compilation_time.is_some());
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_cpp_compile_error() {
    let root = tempfile::tempdir().unwrap();
    let runner = builtin_runner(root.path());

    let request = ExecutionRequest::new(fixture_source("compile_error.cpp"), "cpp");
    let failure = expect_compilation_failure(runner.execute(request).await.unwrap());

    assert_eq!(failure.status, ExecutionStatus::CompilationError);
    assert!(failure.details.contains("error"), "{}", failure.details);
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_python_infinite_loop() {
    let root = tempfile::tempdir().unwrap();
    let runner = builtin_runner(root.path());

    let request = ExecutionRequest::new(fixture_source("infinite_loop.py"), "python");
    let result = expect_freeform(runner.execute(request).await.unwrap());

    assert_eq!(result.status, ExecutionStatus::Timeout);
    assert_eq!(result.output, "started");
    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn test_python_runtime_error() {
    let root = tempfile::tempdir().unwrap();
    let runner = builtin_runner(root.path());

    let request = ExecutionRequest::new(fixture_source("runtime_error.py"), "python");
    let result = expect_freeform(runner.execute(request).await.unwrap());

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.output, "partial");
}
