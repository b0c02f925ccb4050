use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::JudgeError;
use super::types::{ExecutionRequest, JudgeResult, JudgeStatus, SubmissionToken};

/// Transport to the external judge
///
/// Implementations hold no per-batch state and are shared between concurrent
/// orchestrations. Neither call retries; retry policy belongs to the poller.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait JudgeClient: Send + Sync {
    /// Queues all requests as one batch, returning one token per request in order
    async fn submit_batch(
        &self,
        requests: &[ExecutionRequest],
    ) -> Result<Vec<SubmissionToken>, JudgeError>;

    /// Fetches the current state of every token
    async fn fetch_results(
        &self,
        tokens: &[SubmissionToken],
    ) -> Result<Vec<JudgeResult>, JudgeError>;
}

#[derive(Serialize)]
struct BatchBody<'a> {
    submissions: &'a [ExecutionRequest],
}

#[derive(Deserialize)]
struct TokenEntry {
    token: Option<SubmissionToken>,
    #[serde(flatten)]
    errors: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct BatchResults {
    submissions: Vec<Option<ResultEntry>>,
}

#[derive(Deserialize)]
struct StatusEntry {
    id: u32,
    description: String,
}

#[derive(Deserialize)]
struct ResultEntry {
    token: SubmissionToken,
    status: StatusEntry,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    time: Option<String>,
    memory: Option<u64>,
}

impl From<ResultEntry> for JudgeResult {
    fn from(entry: ResultEntry) -> Self {
        Self {
            token: entry.token,
            status: JudgeStatus::from_id(entry.status.id),
            status_description: entry.status.description,
            stdout: entry.stdout,
            stderr: entry.stderr,
            compile_output: entry.compile_output,
            time: entry.time,
            memory: entry.memory,
        }
    }
}

/// HTTP client for a Judge0-compatible batch API
#[derive(Debug, Clone)]
pub struct Judge0Client {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Judge0Client {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, JudgeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("X-Auth-Token", key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, JudgeError> {
        let response = self.with_auth(builder).send().await.map_err(|e| {
            log::error!("Judge request failed: {e}");
            JudgeError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Judge responded with {status}: {body}");
            return Err(JudgeError::transport(format!(
                "judge responded with {status}"
            )));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl JudgeClient for Judge0Client {
    async fn submit_batch(
        &self,
        requests: &[ExecutionRequest],
    ) -> Result<Vec<SubmissionToken>, JudgeError> {
        let url = format!("{}/submissions/batch?base64_encoded=false", self.base_url);
        let builder = self.client.post(url).json(&BatchBody {
            submissions: requests,
        });

        let entries: Vec<TokenEntry> = self
            .send(builder)
            .await?
            .json()
            .await
            .map_err(|e| JudgeError::transport(format!("malformed submit response: {e}")))?;

        if entries.len() != requests.len() {
            return Err(JudgeError::transport(format!(
                "judge returned {} tokens for {} requests",
                entries.len(),
                requests.len()
            )));
        }

        entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| {
                entry.token.ok_or_else(|| {
                    JudgeError::transport(format!(
                        "judge rejected request {}: {}",
                        idx + 1,
                        serde_json::Value::Object(entry.errors)
                    ))
                })
            })
            .collect()
    }

    async fn fetch_results(
        &self,
        tokens: &[SubmissionToken],
    ) -> Result<Vec<JudgeResult>, JudgeError> {
        let joined = tokens
            .iter()
            .map(SubmissionToken::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}/submissions/batch?tokens={joined}&base64_encoded=false",
            self.base_url
        );

        let batch: BatchResults = self
            .send(self.client.get(url))
            .await?
            .json()
            .await
            .map_err(|e| JudgeError::transport(format!("malformed results response: {e}")))?;

        batch
            .submissions
            .into_iter()
            .map(|entry| {
                entry
                    .map(JudgeResult::from)
                    .ok_or_else(|| JudgeError::transport("judge returned an empty result entry"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(stdin: &str, expected: Option<&str>) -> ExecutionRequest {
        ExecutionRequest {
            source_code: "print(sum(map(int, input().split())))".to_string(),
            language_id: 71,
            stdin: stdin.to_string(),
            expected_output: expected.map(str::to_string),
        }
    }

    fn client(server: &MockServer) -> Judge0Client {
        Judge0Client::new(&server.uri(), None, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_submit_batch_posts_all_requests_at_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions/batch"))
            .and(query_param("base64_encoded", "false"))
            .and(body_json(json!({
                "submissions": [
                    {"source_code": "print(sum(map(int, input().split())))", "language_id": 71, "stdin": "3 4", "expected_output": "7"},
                    {"source_code": "print(sum(map(int, input().split())))", "language_id": 71, "stdin": "1 1"}
                ]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                {"token": "tok-a"},
                {"token": "tok-b"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = client(&server)
            .submit_batch(&[request("3 4", Some("7")), request("1 1", None)])
            .await
            .unwrap();

        assert_eq!(
            tokens,
            vec![
                SubmissionToken("tok-a".to_string()),
                SubmissionToken("tok-b".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_batch_sends_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-Auth-Token", "secret"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"token": "t"}])))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            Judge0Client::new(&server.uri(), Some("secret".to_string()), Duration::from_secs(5))
                .unwrap();
        let tokens = client.submit_batch(&[request("", None)]).await.unwrap();
        assert_eq!(tokens.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_batch_rejected_entry_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                {"token": "ok"},
                {"language_id": ["language with id 999 doesn't exist"]}
            ])))
            .mount(&server)
            .await;

        let err = client(&server)
            .submit_batch(&[request("", None), request("", None)])
            .await
            .unwrap_err();

        match err {
            JudgeError::Transport { message } => assert!(message.contains("request 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_batch_token_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"token": "only"}])))
            .mount(&server)
            .await;

        let err = client(&server)
            .submit_batch(&[request("", None), request("", None)])
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_http_failure_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .submit_batch(&[request("", None)])
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_fetch_results_queries_joined_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/submissions/batch"))
            .and(query_param("tokens", "tok-a,tok-b"))
            .and(query_param("base64_encoded", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "submissions": [
                    {
                        "token": "tok-a",
                        "status": {"id": 3, "description": "Accepted"},
                        "stdout": "7\n",
                        "stderr": null,
                        "compile_output": null,
                        "time": "0.049",
                        "memory": 7908
                    },
                    {
                        "token": "tok-b",
                        "status": {"id": 2, "description": "Processing"},
                        "stdout": null,
                        "time": null,
                        "memory": null
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = client(&server)
            .fetch_results(&[
                SubmissionToken("tok-a".to_string()),
                SubmissionToken("tok-b".to_string()),
            ])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, JudgeStatus::Accepted);
        assert_eq!(results[0].stdout.as_deref(), Some("7\n"));
        assert_eq!(results[0].time.as_deref(), Some("0.049"));
        assert_eq!(results[0].memory, Some(7908));
        assert_eq!(results[1].status, JudgeStatus::Processing);
        assert_eq!(results[1].status_description, "Processing");
    }

    #[tokio::test]
    async fn test_fetch_results_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_results(&[SubmissionToken("t".to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::Transport { .. }));
    }
}
