/// Failures of one orchestration call.
///
/// Per-test-case judge outcomes such as a compilation error are not errors; they
/// are folded into the verdicts.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// Judge unreachable, non-success HTTP status or malformed response.
    #[error("judge transport error: {message}")]
    Transport { message: String },

    /// Input rejected before any judge call was made.
    #[error("invalid batch: {message}")]
    Validation { message: String },

    /// Polling budget exhausted before every result became terminal.
    #[error("judge did not finish after {attempts} polls")]
    Timeout { attempts: u32 },

    /// The caller gave up on the orchestration.
    #[error("orchestration cancelled")]
    Cancelled,
}

impl JudgeError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for JudgeError {
    fn from(e: reqwest::Error) -> Self {
        Self::transport(e.to_string())
    }
}
