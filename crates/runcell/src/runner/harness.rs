//! Test-case harness
//!
//! Compiles once, runs the program against each test case in order inside a
//! single workspace, and compares trimmed output against the expectation.

use tracing::{debug, instrument};

use crate::runner::Runner;
use crate::runner::compile::{CompileStep, compile_if_needed};
use crate::runner::execute::run_program;
use crate::types::{
    ExecutionOutcome, ExecutionStatus, ExecutionSummary, Submission, TestCase, TestCaseReport,
    TestCaseResult,
};

/// Check whether program output matches the expected output
///
/// Only leading and trailing whitespace is ignored; interior whitespace and
/// case must match exactly.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

/// Run a submission against every test case, in order
///
/// A compilation failure is reported on every case and no case is run.
#[instrument(skip_all, fields(language = %submission.language.id, cases = submission.test_cases.len()))]
pub async fn execute_test_cases(runner: &Runner, submission: &Submission<'_>) -> TestCaseReport {
    let cases = &submission.test_cases;

    let (workspace, source) = match runner.open_workspace(submission).await {
        Ok(opened) => opened,
        Err(outcome) => {
            let results = failed_results(cases, &outcome.trimmed());
            return report(submission, results, None, true, false);
        }
    };

    let step = compile_if_needed(runner, submission.language, &workspace, &source).await;
    let compilation_time = step.time_ms();
    if let CompileStep::Failed(outcome) = step {
        workspace.release().await;
        let compiled = outcome.status != ExecutionStatus::CompilationError;
        let results = failed_results(cases, &outcome.trimmed());
        return report(submission, results, compilation_time, compiled, false);
    }

    let mut results = Vec::with_capacity(cases.len());
    for (index, case) in cases.iter().enumerate() {
        let outcome = run_program(
            runner.processes(),
            submission.language,
            &workspace,
            &source,
            &case.input,
        )
        .await;
        let result = case_result(index, case, outcome);
        debug!(index, passed = result.passed, status = %result.status, "test case finished");
        results.push(result);
    }

    workspace.release().await;
    report(submission, results, compilation_time, true, true)
}

fn case_result(index: usize, case: &TestCase, outcome: ExecutionOutcome) -> TestCaseResult {
    let passed = outcome.is_success() && outputs_match(&outcome.stdout, &case.expected_output);
    let outcome = outcome.trimmed();
    TestCaseResult {
        index,
        input: case.input.clone(),
        expected_output: case.expected_output.clone(),
        actual_output: outcome.stdout,
        error: outcome.stderr,
        passed,
        execution_time: outcome.execution_time_ms,
        memory_used: outcome.memory_used_bytes,
        status: outcome.status,
        exit_code: outcome.exit_code,
    }
}

/// One failed result per case, all carrying the same outcome
fn failed_results(cases: &[TestCase], outcome: &ExecutionOutcome) -> Vec<TestCaseResult> {
    cases
        .iter()
        .enumerate()
        .map(|(index, case)| TestCaseResult {
            index,
            input: case.input.clone(),
            expected_output: case.expected_output.clone(),
            actual_output: String::new(),
            error: outcome.stderr.clone(),
            passed: false,
            execution_time: 0,
            memory_used: 0,
            status: outcome.status,
            exit_code: outcome.exit_code,
        })
        .collect()
}

fn report(
    submission: &Submission<'_>,
    results: Vec<TestCaseResult>,
    compilation_time: Option<u64>,
    compiled: bool,
    ran: bool,
) -> TestCaseReport {
    let execution_summary = ExecutionSummary::from_results(&results, compilation_time, compiled);
    TestCaseReport {
        success: ran,
        total_tests: results.len(),
        passed_tests: execution_summary.passed_test_cases,
        language: submission.language.id.clone(),
        results,
        execution_summary,
    }
}
