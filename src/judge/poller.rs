use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::client::JudgeClient;
use super::error::JudgeError;
use super::types::{ExecutionRequest, JudgeResult, SubmissionToken};

/// Liveness budget of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between two fetches
    pub interval: Duration,
    /// Upper bound on fetch attempts, failed ones included
    pub max_attempts: u32,
    /// Wall-clock budget measured from the start of submission
    pub deadline: Duration,
    /// Consecutive fetch failures tolerated before giving up
    pub max_fetch_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 150,
            deadline: Duration::from_secs(300),
            max_fetch_failures: 3,
        }
    }
}

/// Drives one batch from submission until every result is terminal
///
/// Outbound calls are gated by a semaphore shared between all pollers of the
/// process. A permit is only held for the duration of a single call, never
/// across the wait between polls.
#[derive(Clone)]
pub struct BatchPoller {
    client: Arc<dyn JudgeClient>,
    policy: PollPolicy,
    permits: Arc<Semaphore>,
}

impl BatchPoller {
    pub fn new(client: Arc<dyn JudgeClient>, policy: PollPolicy, max_in_flight: usize) -> Self {
        Self {
            client,
            policy,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Submits the batch once and polls until completion
    ///
    /// The returned results are index-aligned with `requests`.
    pub async fn run(
        &self,
        requests: &[ExecutionRequest],
        cancel: &CancellationToken,
    ) -> Result<Vec<JudgeResult>, JudgeError> {
        if cancel.is_cancelled() {
            return Err(JudgeError::Cancelled);
        }
        let deadline = Instant::now() + self.policy.deadline;

        let tokens = {
            let _permit = self.acquire(cancel).await?;
            self.client.submit_batch(requests).await?
        };
        if tokens.len() != requests.len() {
            return Err(JudgeError::transport(format!(
                "judge returned {} tokens for {} requests",
                tokens.len(),
                requests.len()
            )));
        }
        log::debug!("Submitted batch of {} requests", tokens.len());

        self.poll(&tokens, deadline, cancel).await
    }

    async fn poll(
        &self,
        tokens: &[SubmissionToken],
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Vec<JudgeResult>, JudgeError> {
        let mut attempts = 0;
        let mut failures = 0;

        loop {
            if cancel.is_cancelled() {
                log::info!("Polling cancelled after {attempts} attempts");
                return Err(JudgeError::Cancelled);
            }

            attempts += 1;
            let fetched = {
                let _permit = self.acquire(cancel).await?;
                self.client.fetch_results(tokens).await
            };

            match fetched {
                Ok(results) => {
                    failures = 0;
                    if results.len() != tokens.len() {
                        log::error!(
                            "Judge returned {} results for {} tokens",
                            results.len(),
                            tokens.len()
                        );
                        return Err(JudgeError::transport(format!(
                            "judge returned {} results for {} tokens",
                            results.len(),
                            tokens.len()
                        )));
                    }
                    let pending = results.iter().filter(|r| !r.status.is_terminal()).count();
                    if pending == 0 {
                        log::debug!("Batch finished after {attempts} polls");
                        return align_by_token(tokens, results);
                    }
                    log::debug!("Poll {attempts}: {pending} of {} still pending", tokens.len());
                }
                Err(e) => {
                    failures += 1;
                    if failures > self.policy.max_fetch_failures {
                        log::error!("Giving up after {failures} consecutive fetch failures: {e}");
                        return Err(e);
                    }
                    log::warn!(
                        "Fetch attempt {attempts} failed ({failures}/{}): {e}",
                        self.policy.max_fetch_failures
                    );
                }
            }

            if attempts >= self.policy.max_attempts
                || Instant::now() + self.policy.interval > deadline
            {
                log::warn!("Batch still pending after {attempts} polls, giving up");
                return Err(JudgeError::Timeout { attempts });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Polling cancelled after {attempts} attempts");
                    return Err(JudgeError::Cancelled);
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }

    async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> Result<tokio::sync::SemaphorePermit<'_>, JudgeError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(JudgeError::Cancelled),
            permit = self.permits.acquire() => {
                permit.map_err(|_| JudgeError::Cancelled)
            }
        }
    }
}

/// Re-associates results with the submitted tokens
///
/// Array position in the judge response is not trusted; every token must be
/// present exactly once.
fn align_by_token(
    tokens: &[SubmissionToken],
    results: Vec<JudgeResult>,
) -> Result<Vec<JudgeResult>, JudgeError> {
    let mut by_token: HashMap<SubmissionToken, JudgeResult> = results
        .into_iter()
        .map(|r| (r.token.clone(), r))
        .collect();

    tokens
        .iter()
        .map(|token| {
            by_token
                .remove(token)
                .ok_or_else(|| JudgeError::transport(format!("no result for token {token}")))
        })
        .collect()
}
