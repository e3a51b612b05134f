//! N8nClient -- concrete [`RemoteEngine`] implementation over HTTP.
//!
//! Posts workflow input envelopes to n8n webhook URLs and polls the n8n
//! REST API for execution status. The webhook URL is supplied per call by
//! the remote executor; the base URL configured here is only used for the
//! `/executions/{id}` polling endpoint.
//!
//! The engine's own execution id is taken from the `x-n8n-execution-id`
//! response header when present, falling back to well-known body fields.

use std::time::Duration;

use serde_json::Value;

use flowtrace_core::executor::remote::{RemoteEngine, RemoteExecutionStatus, RemoteReply};
use flowtrace_types::envelope::WorkflowInput;
use flowtrace_types::error::RemoteError;

/// Response header n8n uses to report the execution it started.
const EXECUTION_ID_HEADER: &str = "x-n8n-execution-id";

/// HTTP client for the n8n workflow engine.
pub struct N8nClient {
    client: reqwest::Client,
    base_url: Option<String>,
    timeout_secs: u64,
}

impl N8nClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: None,
            timeout_secs,
        }
    }

    /// Set the n8n REST API base URL, enabling execution status polling.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    fn map_error(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.timeout_secs)
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

/// Pull the engine's execution id out of the response body, when the
/// header did not carry it.
fn execution_id_from_body(body: &Value) -> Option<String> {
    for key in ["executionId", "execution_id"] {
        if let Some(id) = body.get(key).and_then(Value::as_str) {
            return Some(id.to_string());
        }
    }
    None
}

/// Interpret an n8n `/executions/{id}` response body.
fn parse_execution_status(body: &Value) -> RemoteExecutionStatus {
    let finished = body.get("finished").and_then(Value::as_bool).unwrap_or(false);
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or(if finished { "success" } else { "running" })
        .to_string();
    let output = body.get("data").cloned();

    RemoteExecutionStatus {
        finished,
        status,
        output,
    }
}

impl RemoteEngine for N8nClient {
    async fn invoke(&self, url: &str, input: &WorkflowInput) -> Result<RemoteReply, RemoteError> {
        tracing::debug!(url, action = %input.action, "invoking n8n webhook");

        let response = self
            .client
            .post(url)
            .json(input)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let header_execution_id = response
            .headers()
            .get(EXECUTION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;

        let execution_id = header_execution_id.or_else(|| execution_id_from_body(&body));

        Ok(RemoteReply { body, execution_id })
    }

    async fn execution_status(
        &self,
        execution_id: &str,
    ) -> Result<RemoteExecutionStatus, RemoteError> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            RemoteError::Network("no n8n base URL configured for status polling".to_string())
        })?;

        let response = self
            .client
            .get(format!("{base_url}/executions/{execution_id}"))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;

        Ok(parse_execution_status(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_id_from_body_variants() {
        assert_eq!(
            execution_id_from_body(&json!({"executionId": "abc"})).as_deref(),
            Some("abc")
        );
        assert_eq!(
            execution_id_from_body(&json!({"execution_id": "def"})).as_deref(),
            Some("def")
        );
        assert!(execution_id_from_body(&json!({"other": "ghi"})).is_none());
        assert!(execution_id_from_body(&json!({"executionId": 42})).is_none());
    }

    #[test]
    fn test_parse_execution_status_finished() {
        let status = parse_execution_status(&json!({
            "finished": true,
            "status": "success",
            "data": {"resultData": {}}
        }));
        assert!(status.finished);
        assert_eq!(status.status, "success");
        assert!(status.output.is_some());
    }

    #[test]
    fn test_parse_execution_status_defaults() {
        let status = parse_execution_status(&json!({}));
        assert!(!status.finished);
        assert_eq!(status.status, "running");
        assert!(status.output.is_none());

        let status = parse_execution_status(&json!({"finished": true}));
        assert_eq!(status.status, "success");
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let client = N8nClient::new(30).with_base_url("https://n8n.local/api/v1/".to_string());
        assert_eq!(client.base_url.as_deref(), Some("https://n8n.local/api/v1"));
    }

    #[tokio::test]
    async fn test_status_polling_requires_base_url() {
        let client = N8nClient::new(30);
        let err = client.execution_status("ex-1").await.unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
    }
}
