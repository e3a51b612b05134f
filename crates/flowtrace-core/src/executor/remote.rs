//! Remote (n8n) workflow execution.
//!
//! [`RemoteExecutor`] resolves a workflow's endpoint reference to a webhook
//! URL (consulting the [`WebhookUrlCache`] first), posts the input envelope
//! through the [`RemoteEngine`] port, and maps the reply into the standard
//! output envelope. Every remote failure -- network error, timeout, non-2xx
//! status, malformed body -- becomes a retryable `REMOTE_CALL_FAILED`
//! envelope; this method never returns an error to the router.
//!
//! For engines that execute asynchronously, the synchronous call only
//! confirms the workflow was accepted; completion is observed through
//! [`RemoteExecutor::poll_status`].

use std::time::Instant;

use chrono::Utc;
use serde_json::{Map, Value};

use flowtrace_types::envelope::{OutputMetadata, WorkflowError, WorkflowInput, WorkflowOutput};
use flowtrace_types::error::RemoteError;

use super::cache::WebhookUrlCache;
use crate::registry::EndpointRef;

// ---------------------------------------------------------------------------
// RemoteEngine port
// ---------------------------------------------------------------------------

/// Reply from one webhook invocation.
#[derive(Debug, Clone)]
pub struct RemoteReply {
    /// The HTTP response body, parsed as JSON.
    pub body: Value,
    /// The engine's own execution id, when it reported one (header or body).
    pub execution_id: Option<String>,
}

/// Status of an asynchronously-executing remote workflow.
#[derive(Debug, Clone)]
pub struct RemoteExecutionStatus {
    /// Whether the remote run has reached a terminal state.
    pub finished: bool,
    /// The engine's status string (e.g. "running", "success", "error").
    pub status: String,
    /// Final output data, when finished and available.
    pub output: Option<Value>,
}

/// Port for the remote workflow engine's HTTP surface.
///
/// Implemented in `flowtrace-infra` with reqwest; tests use scripted fakes.
pub trait RemoteEngine: Send + Sync {
    /// POST the input envelope to a webhook URL and parse the reply.
    fn invoke(
        &self,
        url: &str,
        input: &WorkflowInput,
    ) -> impl std::future::Future<Output = Result<RemoteReply, RemoteError>> + Send;

    /// Poll the engine for the status of one of its executions.
    fn execution_status(
        &self,
        execution_id: &str,
    ) -> impl std::future::Future<Output = Result<RemoteExecutionStatus, RemoteError>> + Send;
}

// ---------------------------------------------------------------------------
// RemoteExecutor
// ---------------------------------------------------------------------------

/// Dispatches input envelopes to the remote engine.
pub struct RemoteExecutor<E: RemoteEngine> {
    engine: E,
    cache: WebhookUrlCache,
}

impl<E: RemoteEngine> RemoteExecutor<E> {
    /// Create an executor over an engine and an injectable URL cache.
    pub fn new(engine: E, cache: WebhookUrlCache) -> Self {
        Self { engine, cache }
    }

    /// The executor's webhook URL cache.
    pub fn cache(&self) -> &WebhookUrlCache {
        &self.cache
    }

    /// Call the remote workflow, mapping all failures to a retryable
    /// `REMOTE_CALL_FAILED` envelope.
    pub async fn call(
        &self,
        workflow_id: &str,
        endpoint: &EndpointRef,
        input: &WorkflowInput,
    ) -> WorkflowOutput {
        let started = Instant::now();

        let url = match self.resolve_url(workflow_id, endpoint) {
            Some(url) => url,
            None => {
                tracing::warn!(workflow_id, "no webhook URL resolvable for workflow");
                return failure(
                    workflow_id,
                    started,
                    WorkflowError::remote_call_failed(format!(
                        "no webhook URL resolvable for workflow '{workflow_id}'"
                    )),
                );
            }
        };

        match self.engine.invoke(&url, input).await {
            Ok(reply) => {
                let mut output = map_reply(workflow_id, reply.body);
                output.metadata.execution_id = reply.execution_id;
                output.metadata.executed_at = Utc::now();
                output.metadata.duration_ms = started.elapsed().as_millis() as u64;
                output
            }
            Err(err) => {
                tracing::warn!(workflow_id, url, error = %err, "remote call failed");
                failure(
                    workflow_id,
                    started,
                    WorkflowError::remote_call_failed(err.to_string()),
                )
            }
        }
    }

    /// Poll the engine for an asynchronous execution's status.
    pub async fn poll_status(
        &self,
        execution_id: &str,
    ) -> Result<RemoteExecutionStatus, RemoteError> {
        self.engine.execution_status(execution_id).await
    }

    /// Resolve the webhook URL: cache hit first, then the endpoint
    /// reference. Freshly-resolved URLs are written back to the cache.
    fn resolve_url(&self, workflow_id: &str, endpoint: &EndpointRef) -> Option<String> {
        if let Some(url) = self.cache.get_webhook_url(workflow_id) {
            return Some(url);
        }
        let url = endpoint.resolve()?;
        self.cache.set_webhook_url(workflow_id, &url);
        Some(url)
    }
}

/// Interpret the webhook response body as the remote workflow's reply.
///
/// A body that already conforms to the output envelope is used as-is
/// (metadata is restamped by the caller); any other JSON object becomes the
/// `data` map of a success envelope, and a non-object body is wrapped under
/// a `result` key.
fn map_reply(workflow_id: &str, body: Value) -> WorkflowOutput {
    if body.get("success").is_some_and(Value::is_boolean) {
        if let Ok(output) = serde_json::from_value::<WorkflowOutput>(body.clone()) {
            return output;
        }
    }

    let data = match body {
        Value::Object(map) => map,
        other => Map::from_iter([("result".to_string(), other)]),
    };
    WorkflowOutput::ok(data, OutputMetadata::stamp(workflow_id))
}

fn failure(workflow_id: &str, started: Instant, error: WorkflowError) -> WorkflowOutput {
    let mut metadata = OutputMetadata::stamp(workflow_id);
    metadata.duration_ms = started.elapsed().as_millis() as u64;
    WorkflowOutput::err(error, metadata)
}
