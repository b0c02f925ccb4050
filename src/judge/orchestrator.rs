use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::aggregator::{OverallVerdict, ReferenceFailure, aggregate, check_reference};
use super::error::JudgeError;
use super::evaluator::evaluate;
use super::poller::BatchPoller;
use super::types::ExecutionRequest;
use crate::config::{LanguageConfig, language_id};

/// One input with the output it should produce
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

impl TestCase {
    /// Pairs parallel stdin and expected-output lists
    pub fn zip(stdin: Vec<String>, expected: Vec<String>) -> Result<Vec<Self>, JudgeError> {
        if stdin.len() != expected.len() {
            return Err(JudgeError::validation(format!(
                "{} inputs but {} expected outputs",
                stdin.len(),
                expected.len()
            )));
        }
        Ok(stdin
            .into_iter()
            .zip(expected)
            .map(|(input, output)| Self { input, output })
            .collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error(transparent)]
    Judge(#[from] JudgeError),
    #[error(transparent)]
    Failed(#[from] ReferenceFailure),
}

/// Entry point of the execution core, shared by the execute and authoring flows
#[derive(Clone)]
pub struct Orchestrator {
    poller: BatchPoller,
    languages: Vec<LanguageConfig>,
}

impl Orchestrator {
    pub fn new(poller: BatchPoller, languages: Vec<LanguageConfig>) -> Self {
        Self { poller, languages }
    }

    pub fn languages(&self) -> &[LanguageConfig] {
        &self.languages
    }

    /// Runs `source_code` against every test case and returns the overall verdict
    pub async fn execute(
        &self,
        source_code: &str,
        language_id: u32,
        test_cases: &[TestCase],
        cancel: &CancellationToken,
    ) -> Result<OverallVerdict, JudgeError> {
        self.validate(language_id, test_cases)?;

        let requests = build_requests(source_code, language_id, test_cases);
        let results = self.poller.run(&requests, cancel).await?;

        let verdicts = requests
            .iter()
            .zip(&results)
            .enumerate()
            .map(|(idx, (request, result))| evaluate(idx as u32 + 1, request, result))
            .collect();
        let overall = aggregate(verdicts);

        log::info!(
            "Executed {} test cases in language {language_id}: accepted={}",
            test_cases.len(),
            overall.accepted
        );
        Ok(overall)
    }

    /// Checks every reference solution against every test case
    ///
    /// Languages are checked in order; the first failing test case of the first
    /// failing language aborts the whole check.
    pub async fn validate_reference_solutions(
        &self,
        solutions: &[(String, String)],
        test_cases: &[TestCase],
        cancel: &CancellationToken,
    ) -> Result<(), ReferenceError> {
        if solutions.is_empty() {
            return Err(JudgeError::validation("no reference solutions given").into());
        }

        let resolved = solutions
            .iter()
            .map(|(language, code)| {
                language_id(&self.languages, language)
                    .map(|id| (language.as_str(), id, code.as_str()))
                    .ok_or_else(|| JudgeError::validation(format!("Invalid language: {language}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (language, id, code) in resolved {
            self.validate(id, test_cases)?;
            let requests = build_requests(code, id, test_cases);
            let results = self.poller.run(&requests, cancel).await?;

            check_reference(language, &requests, &results).inspect_err(|failure| {
                log::info!("{failure}");
            })?;
            log::debug!("Reference solution for {language} passed");
        }

        Ok(())
    }

    fn validate(&self, language_id: u32, test_cases: &[TestCase]) -> Result<(), JudgeError> {
        if test_cases.is_empty() {
            return Err(JudgeError::validation("Invalid or missing test cases"));
        }
        if !self.languages.iter().any(|l| l.id == language_id) {
            return Err(JudgeError::validation(format!(
                "Unknown language id {language_id}"
            )));
        }
        Ok(())
    }
}

fn build_requests(
    source_code: &str,
    language_id: u32,
    test_cases: &[TestCase],
) -> Vec<ExecutionRequest> {
    test_cases
        .iter()
        .map(|tc| ExecutionRequest {
            source_code: source_code.to_string(),
            language_id,
            stdin: tc.input.clone(),
            expected_output: Some(tc.output.clone()),
        })
        .collect()
}
