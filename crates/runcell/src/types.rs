use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Language, LanguageRegistry};

/// An execution request as submitted by a caller
///
/// Every field is optional on the wire so that missing fields can be reported
/// by name; [`validate`](Self::validate) turns it into a [`Submission`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Source code
    #[serde(default)]
    pub code: Option<String>,

    /// Language ID (e.g., "python", "cpp")
    #[serde(default)]
    pub language: Option<String>,

    /// Standard input for free-form runs
    #[serde(default)]
    pub input: Option<String>,

    /// Test cases; when non-empty the test-case harness is used
    #[serde(default)]
    pub test_cases: Option<Vec<TestCase>>,
}

impl ExecutionRequest {
    /// Create a free-form request
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            language: Some(language.into()),
            input: None,
            test_cases: None,
        }
    }

    /// Set the standard input
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Set the test cases
    pub fn with_test_cases(mut self, test_cases: Vec<TestCase>) -> Self {
        self.test_cases = Some(test_cases);
        self
    }

    /// Check required fields and resolve the language
    ///
    /// Touches nothing outside the registry, so a rejected request has no side effects.
    pub fn validate<'r>(
        self,
        registry: &'r LanguageRegistry,
    ) -> Result<Submission<'r>, RequestError> {
        let code = self
            .code
            .filter(|code| !code.is_empty())
            .ok_or(RequestError::MissingField("code"))?;
        let language_id = self
            .language
            .filter(|language| !language.trim().is_empty())
            .ok_or(RequestError::MissingField("language"))?;
        let language = registry
            .lookup(&language_id)
            .map_err(|_| RequestError::UnsupportedLanguage(language_id))?;

        Ok(Submission {
            code,
            language,
            stdin: self.input.unwrap_or_default(),
            test_cases: self.test_cases.unwrap_or_default(),
        })
    }
}

/// A validated request bound to a registered language
#[derive(Debug, Clone)]
pub struct Submission<'r> {
    pub code: String,
    pub language: &'r Language,
    pub stdin: String,
    pub test_cases: Vec<TestCase>,
}

impl Submission<'_> {
    /// Check if the test-case harness should handle this submission
    pub fn has_test_cases(&self) -> bool {
        !self.test_cases.is_empty()
    }
}

/// One input/expected-output pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub input: String,

    #[serde(default)]
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Request validation failures, reported before any resource is touched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Status of one process invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Program exited with code zero
    Success,

    /// Non-zero exit, signal, or failure to start
    Error,

    /// Killed after the time bound
    Timeout,

    /// The compiler rejected the source
    CompilationError,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::CompilationError => "compilation_error",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error (or a failure description)
    pub stderr: String,

    /// Exit code, -1 when the process did not exit on its own
    pub exit_code: i32,

    /// Signal number if the program was killed by a signal
    pub signal: Option<i32>,

    /// Wall-clock time from spawn to resolution in milliseconds
    pub execution_time_ms: u64,

    /// Reserved; always 0 because memory is not measured
    pub memory_used_bytes: u64,
}

impl ExecutionOutcome {
    /// An `error` outcome for a failure that happened before or instead of running
    pub fn failed(message: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            status: ExecutionStatus::Error,
            stdout: String::new(),
            stderr: message.into(),
            exit_code: -1,
            signal: None,
            execution_time_ms,
            memory_used_bytes: 0,
        }
    }

    /// A `compilation_error` outcome carrying the compiler diagnostic
    pub fn compilation_error(diagnostic: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            status: ExecutionStatus::CompilationError,
            ..Self::failed(diagnostic, execution_time_ms)
        }
    }

    /// Check if the program exited with code zero
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Trim surrounding whitespace from stdout and stderr
    pub fn trimmed(mut self) -> Self {
        self.stdout = self.stdout.trim().to_owned();
        self.stderr = self.stderr.trim().to_owned();
        self
    }
}

/// Free-form response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeformResult {
    pub success: bool,
    pub output: String,
    pub error: String,
    pub execution_time: u64,
    pub memory_used: u64,
    pub status: ExecutionStatus,
    pub exit_code: i32,
    pub language: String,
}

/// Payload returned when a free-form request fails to compile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationFailure {
    pub success: bool,
    pub error: String,
    pub details: String,
    pub execution_time: u64,
    pub status: ExecutionStatus,
    pub language: String,
}

/// Result of running one test case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub index: usize,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub error: String,
    pub passed: bool,
    pub execution_time: u64,
    pub memory_used: u64,
    pub status: ExecutionStatus,
    pub exit_code: i32,
}

/// Overall state of a test-case batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    AllPassed,
    Partial,
    NonePassed,
    CompilationError,
}

/// Aggregate timing and pass statistics for a test-case batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub total_test_cases: usize,
    pub passed_test_cases: usize,
    pub failed_test_cases: usize,
    /// Percentage of passed cases, 0.0 to 100.0
    pub success_rate: f64,
    pub total_execution_time: u64,
    pub average_execution_time: f64,
    pub compilation_time: Option<u64>,
    pub status: SummaryStatus,
}

impl ExecutionSummary {
    /// Summarize ordered results; `compiled` is false when compilation failed
    pub fn from_results(
        results: &[TestCaseResult],
        compilation_time: Option<u64>,
        compiled: bool,
    ) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let total_time: u64 = results.iter().map(|r| r.execution_time).sum();

        let status = if !compiled {
            SummaryStatus::CompilationError
        } else if passed == total {
            SummaryStatus::AllPassed
        } else if passed == 0 {
            SummaryStatus::NonePassed
        } else {
            SummaryStatus::Partial
        };

        let (success_rate, average) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                passed as f64 / total as f64 * 100.0,
                total_time as f64 / total as f64,
            )
        };

        Self {
            total_test_cases: total,
            passed_test_cases: passed,
            failed_test_cases: total - passed,
            success_rate,
            total_execution_time: total_time,
            average_execution_time: average,
            compilation_time,
            status,
        }
    }
}

/// Test-case mode response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseReport {
    pub success: bool,
    pub results: Vec<TestCaseResult>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub language: String,
    pub execution_summary: ExecutionSummary,
}

/// Any successful (well-formed) response to an execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionResponse {
    TestCases(TestCaseReport),
    CompilationFailed(CompilationFailure),
    Freeform(FreeformResult),
}

impl ExecutionResponse {
    /// Build the free-form payload (or the compilation failure payload) from an outcome
    pub fn from_outcome(outcome: ExecutionOutcome, language: &str) -> Self {
        if outcome.status == ExecutionStatus::CompilationError {
            return ExecutionResponse::CompilationFailed(CompilationFailure {
                success: false,
                error: "Compilation Error".to_owned(),
                details: outcome.stderr,
                execution_time: outcome.execution_time_ms,
                status: outcome.status,
                language: language.to_owned(),
            });
        }

        ExecutionResponse::Freeform(FreeformResult {
            success: outcome.is_success(),
            output: outcome.stdout,
            error: outcome.stderr,
            execution_time: outcome.execution_time_ms,
            memory_used: outcome.memory_used_bytes,
            status: outcome.status,
            exit_code: outcome.exit_code,
            language: language.to_owned(),
        })
    }

    /// Whether the request ran to a successful conclusion
    pub fn is_success(&self) -> bool {
        match self {
            ExecutionResponse::TestCases(report) => {
                report.success && report.passed_tests == report.total_tests
            }
            ExecutionResponse::CompilationFailed(_) => false,
            ExecutionResponse::Freeform(result) => result.success,
        }
    }
}
