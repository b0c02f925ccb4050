use serde::Serialize;

use super::types::{ExecutionRequest, JudgeResult};

/// Outcome of one test case, with the judge diagnostics carried through
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TestCaseVerdict {
    /// 1-based, in submission order
    pub test_case: u32,
    pub passed: bool,
    pub stdout: Option<String>,
    pub expected: Option<String>,
    pub status: String,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub memory: Option<String>,
    pub time: Option<String>,
}

/// Outputs are equal once leading and trailing whitespace is removed.
///
/// Case and inner whitespace still matter.
pub fn outputs_match(actual: Option<&str>, expected: Option<&str>) -> bool {
    actual.unwrap_or_default().trim() == expected.unwrap_or_default().trim()
}

/// Reduces one request/result pair into a verdict
///
/// Only a program that ran to completion can pass; compilation errors, runtime
/// errors, time limits and judge failures never do.
pub fn evaluate(index: u32, request: &ExecutionRequest, result: &JudgeResult) -> TestCaseVerdict {
    let passed = result.status.ran_to_completion()
        && outputs_match(result.stdout.as_deref(), request.expected_output.as_deref());

    TestCaseVerdict {
        test_case: index,
        passed,
        stdout: result.stdout.as_deref().map(|s| s.trim().to_string()),
        expected: request
            .expected_output
            .as_deref()
            .map(|s| s.trim().to_string()),
        status: result.status_description.clone(),
        stderr: non_empty(&result.stderr),
        compile_output: non_empty(&result.compile_output),
        memory: result.memory.map(|kb| format!("{kb} KB")),
        time: non_empty(&result.time).map(|secs| format!("{secs} sec")),
    }
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field.as_ref().filter(|s| !s.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::types::{JudgeStatus, SubmissionToken};

    fn request(expected: &str) -> ExecutionRequest {
        ExecutionRequest {
            source_code: "print(8)".to_string(),
            language_id: 71,
            stdin: String::new(),
            expected_output: Some(expected.to_string()),
        }
    }

    fn result(status_id: u32, stdout: Option<&str>) -> JudgeResult {
        JudgeResult {
            token: SubmissionToken("t".to_string()),
            status: JudgeStatus::from_id(status_id),
            status_description: "Accepted".to_string(),
            stdout: stdout.map(str::to_string),
            stderr: None,
            compile_output: None,
            time: Some("0.049".to_string()),
            memory: Some(7908),
        }
    }

    #[test]
    fn test_trailing_newline_passes() {
        let verdict = evaluate(1, &request("8"), &result(3, Some("8\n")));
        assert!(verdict.passed);
        assert_eq!(verdict.stdout.as_deref(), Some("8"));
        assert_eq!(verdict.expected.as_deref(), Some("8"));
        assert_eq!(verdict.memory.as_deref(), Some("7908 KB"));
        assert_eq!(verdict.time.as_deref(), Some("0.049 sec"));
    }

    #[test]
    fn test_case_and_inner_whitespace_matter() {
        assert!(!evaluate(1, &request("Hello"), &result(3, Some("hello"))).passed);
        assert!(!evaluate(1, &request("1 2"), &result(3, Some("1  2"))).passed);
        assert!(evaluate(1, &request("1 2"), &result(3, Some("  1 2 \n"))).passed);
    }

    #[test]
    fn test_absent_stdout_counts_as_empty() {
        assert!(evaluate(1, &request(""), &result(3, None)).passed);
        assert!(!evaluate(1, &request("8"), &result(3, None)).passed);
    }

    #[test]
    fn test_failure_status_never_passes() {
        for status_id in [5, 6, 7, 11, 13, 14, 99] {
            let verdict = evaluate(2, &request("8"), &result(status_id, Some("8")));
            assert!(!verdict.passed, "status {status_id}");
            assert_eq!(verdict.test_case, 2);
        }
    }

    #[test]
    fn test_wrong_answer_status_uses_local_comparison() {
        assert!(evaluate(1, &request("8"), &result(4, Some("8\n"))).passed);
        assert!(!evaluate(1, &request("8"), &result(4, Some("9"))).passed);
    }

    #[test]
    fn test_diagnostics_carried_through() {
        let mut judged = result(6, None);
        judged.status_description = "Compilation Error".to_string();
        judged.compile_output = Some("SyntaxError: invalid syntax".to_string());
        judged.stderr = Some(String::new());
        judged.time = None;
        judged.memory = None;

        let verdict = evaluate(1, &request("8"), &judged);
        assert_eq!(verdict.status, "Compilation Error");
        assert_eq!(
            verdict.compile_output.as_deref(),
            Some("SyntaxError: invalid syntax")
        );
        assert_eq!(verdict.stderr, None);
        assert_eq!(verdict.time, None);
        assert_eq!(verdict.memory, None);
    }

    #[test]
    fn test_evaluate_is_pure() {
        let req = request("7");
        let res = result(3, Some("7\n"));
        assert_eq!(evaluate(1, &req, &res), evaluate(1, &req, &res));
    }
}
