mod aggregator;
mod client;
mod error;
mod evaluator;
mod orchestrator;
mod poller;
mod types;

pub use aggregator::{
    OverallVerdict, ReferenceFailure, SubmissionStatus, SubmissionSummary, aggregate,
    check_reference,
};
pub use client::{Judge0Client, JudgeClient};
pub use error::JudgeError;
pub use evaluator::{TestCaseVerdict, evaluate, outputs_match};
pub use orchestrator::{Orchestrator, ReferenceError, TestCase};
pub use poller::{BatchPoller, PollPolicy};
pub use types::{ExecutionRequest, JudgeResult, JudgeStatus, RuntimeErrorKind, SubmissionToken};
