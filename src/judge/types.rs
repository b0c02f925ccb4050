use std::fmt;

use serde::{Deserialize, Serialize};

/// One test case of a batch, exactly as it is sent to the judge
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
}

/// Judge-issued handle of one queued request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SubmissionToken(pub String);

impl SubmissionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    Sigsegv,
    Sigxfsz,
    Sigfpe,
    Sigabrt,
    Nzec,
    Other,
}

/// Status of a request as assigned by the judge
///
/// `InQueue -> Processing -> terminal`; terminal values never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeStatus {
    InQueue,
    Processing,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeError(RuntimeErrorKind),
    InternalError,
    ExecFormatError,
    Unknown(u32),
}

impl JudgeStatus {
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Self::InQueue,
            2 => Self::Processing,
            3 => Self::Accepted,
            4 => Self::WrongAnswer,
            5 => Self::TimeLimitExceeded,
            6 => Self::CompilationError,
            7 => Self::RuntimeError(RuntimeErrorKind::Sigsegv),
            8 => Self::RuntimeError(RuntimeErrorKind::Sigxfsz),
            9 => Self::RuntimeError(RuntimeErrorKind::Sigfpe),
            10 => Self::RuntimeError(RuntimeErrorKind::Sigabrt),
            11 => Self::RuntimeError(RuntimeErrorKind::Nzec),
            12 => Self::RuntimeError(RuntimeErrorKind::Other),
            13 => Self::InternalError,
            14 => Self::ExecFormatError,
            other => Self::Unknown(other),
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::InQueue => 1,
            Self::Processing => 2,
            Self::Accepted => 3,
            Self::WrongAnswer => 4,
            Self::TimeLimitExceeded => 5,
            Self::CompilationError => 6,
            Self::RuntimeError(kind) => match kind {
                RuntimeErrorKind::Sigsegv => 7,
                RuntimeErrorKind::Sigxfsz => 8,
                RuntimeErrorKind::Sigfpe => 9,
                RuntimeErrorKind::Sigabrt => 10,
                RuntimeErrorKind::Nzec => 11,
                RuntimeErrorKind::Other => 12,
            },
            Self::InternalError => 13,
            Self::ExecFormatError => 14,
            Self::Unknown(id) => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InQueue | Self::Processing)
    }

    /// The submitted program ran to completion and produced output worth comparing
    pub fn ran_to_completion(&self) -> bool {
        matches!(self, Self::Accepted | Self::WrongAnswer)
    }
}

/// What the judge reported for one token
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeResult {
    pub token: SubmissionToken,
    pub status: JudgeStatus,
    pub status_description: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    /// Wall time in seconds, as reported
    pub time: Option<String>,
    /// Peak memory in KB
    pub memory: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ids_round_trip_through_the_table() {
        for id in 1..=14 {
            assert_eq!(JudgeStatus::from_id(id).id(), id);
        }
        assert_eq!(JudgeStatus::from_id(42), JudgeStatus::Unknown(42));
    }

    #[test]
    fn test_only_queue_and_processing_are_pending() {
        assert!(!JudgeStatus::from_id(1).is_terminal());
        assert!(!JudgeStatus::from_id(2).is_terminal());
        for id in 3..=15 {
            assert!(JudgeStatus::from_id(id).is_terminal(), "status {id}");
        }
    }

    #[test]
    fn test_expected_output_is_omitted_when_absent() {
        let request = ExecutionRequest {
            source_code: "print(1)".to_string(),
            language_id: 71,
            stdin: String::new(),
            expected_output: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("expected_output").is_none());
        assert_eq!(body["language_id"], 71);
    }
}
