use serde::Serialize;

use super::evaluator::{TestCaseVerdict, outputs_match};
use super::types::{ExecutionRequest, JudgeResult, JudgeStatus};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OverallVerdict {
    pub accepted: bool,
    pub test_cases: Vec<TestCaseVerdict>,
}

/// Overall status as stored with a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Accepted,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// Accepted iff there is at least one test case and every one passed
pub fn aggregate(test_cases: Vec<TestCaseVerdict>) -> OverallVerdict {
    let accepted = !test_cases.is_empty() && test_cases.iter().all(|v| v.passed);
    OverallVerdict {
        accepted,
        test_cases,
    }
}

/// Per-submission diagnostics in storage shape
///
/// Every list is a JSON array with one entry per test case. Apart from stdout,
/// a list is only kept when at least one test case produced the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSummary {
    pub status: SubmissionStatus,
    pub stdout: String,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub memory: Option<String>,
    pub time: Option<String>,
}

impl SubmissionSummary {
    pub fn from_verdict(verdict: &OverallVerdict) -> Self {
        let cases = &verdict.test_cases;
        Self {
            status: if verdict.accepted {
                SubmissionStatus::Accepted
            } else {
                SubmissionStatus::Rejected
            },
            stdout: json_list(cases.iter().map(|c| &c.stdout)),
            stderr: collect_if_any(cases.iter().map(|c| &c.stderr)),
            compile_output: collect_if_any(cases.iter().map(|c| &c.compile_output)),
            memory: collect_if_any(cases.iter().map(|c| &c.memory)),
            time: collect_if_any(cases.iter().map(|c| &c.time)),
        }
    }
}

fn json_list<'a>(fields: impl Iterator<Item = &'a Option<String>>) -> String {
    serde_json::Value::Array(
        fields
            .map(|f| f.clone().map_or(serde_json::Value::Null, serde_json::Value::String))
            .collect(),
    )
    .to_string()
}

fn collect_if_any<'a>(fields: impl Iterator<Item = &'a Option<String>> + Clone) -> Option<String> {
    fields
        .clone()
        .any(|f| f.is_some())
        .then(|| json_list(fields))
}

/// First failure of a reference solution
#[derive(Serialize, Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reference solution failed for language {language} on test case {test_case}")]
pub struct ReferenceFailure {
    pub language: String,
    /// 1-based
    pub test_case: u32,
    pub status: String,
    pub stdout: Option<String>,
    pub expected: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
}

/// Fail-fast check of one language's reference solution
///
/// Stops at the first test case that was not accepted by the judge or whose
/// output differs from the expected one.
pub fn check_reference(
    language: &str,
    requests: &[ExecutionRequest],
    results: &[JudgeResult],
) -> Result<(), ReferenceFailure> {
    for (idx, (request, result)) in requests.iter().zip(results).enumerate() {
        let accepted = result.status == JudgeStatus::Accepted
            && outputs_match(result.stdout.as_deref(), request.expected_output.as_deref());
        if !accepted {
            return Err(ReferenceFailure {
                language: language.to_string(),
                test_case: idx as u32 + 1,
                status: result.status_description.clone(),
                stdout: result.stdout.clone(),
                expected: request.expected_output.clone(),
                stderr: result.stderr.clone(),
                compile_output: result.compile_output.clone(),
            });
        }
    }
    Ok(())
}
