//! Workflow request/response envelopes.
//!
//! Every workflow dispatch, local or remote, speaks the same contract:
//! a [`WorkflowInput`] carrying an action, an opaque payload, and a
//! correlation context, answered by a [`WorkflowOutput`] carrying either
//! data or a structured error plus execution metadata. The router is
//! deliberately payload-agnostic; `payload` and `data` stay open maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Input envelope
// ---------------------------------------------------------------------------

/// The standard request envelope accepted by the workflow router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInput {
    /// The logical operation the workflow should perform.
    pub action: String,
    /// Opaque request payload, interpreted only by the target workflow.
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Correlation and attribution context.
    pub context: InputContext,
}

/// Correlation context attached to every workflow input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputContext {
    /// The user on whose behalf the call is made.
    pub user_id: String,
    /// Caller-supplied correlation id, stable across retries of the same
    /// logical call.
    pub trace_id: String,
    /// When the caller issued the request.
    pub requested_at: DateTime<Utc>,
    /// Which service originated the call.
    pub source_service: SourceService,
    /// Attempt number (1-based). Increments per retry of the same `trace_id`.
    #[serde(default = "default_attempt")]
    pub attempt: u32,
}

fn default_attempt() -> u32 {
    1
}

/// The service that originated a workflow call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceService {
    ReplitShell,
    Bilko,
    N8n,
}

// ---------------------------------------------------------------------------
// Output envelope
// ---------------------------------------------------------------------------

/// The standard response envelope produced by the workflow router.
///
/// Exactly one of `data`/`error` is meaningfully populated, matching
/// `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutput {
    /// Whether the workflow completed successfully.
    pub success: bool,
    /// Result payload (populated when `success` is true).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Structured error (populated when `success` is false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WorkflowError>,
    /// Execution metadata filled by the dispatching executor.
    pub metadata: OutputMetadata,
}

/// Metadata attached to every workflow output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMetadata {
    /// The workflow that produced this output.
    pub workflow_id: String,
    /// Execution record id, when one was created or reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    /// When execution finished.
    pub executed_at: DateTime<Utc>,
    /// Wall-clock duration of the dispatch in milliseconds.
    pub duration_ms: u64,
}

impl OutputMetadata {
    /// Fresh metadata stamped "now" with zero duration; executors overwrite
    /// the timing fields after the fact.
    pub fn stamp(workflow_id: &str) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            execution_id: None,
            executed_at: Utc::now(),
            duration_ms: 0,
        }
    }
}

impl WorkflowOutput {
    /// Build a success envelope.
    pub fn ok(data: Map<String, Value>, metadata: OutputMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata,
        }
    }

    /// Build a failure envelope.
    pub fn err(error: WorkflowError, metadata: OutputMetadata) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            metadata,
        }
    }
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// The closed error taxonomy surfaced through [`WorkflowOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Registry lookup miss. Never retryable.
    UnknownWorkflow,
    /// A local handler returned an error. Retryability is handler-defined;
    /// defaults to non-retryable.
    ExecutionError,
    /// Network/HTTP/parse failure calling the remote engine. Retryable by
    /// default.
    RemoteCallFailed,
    /// The audit manifest could not be loaded or processed.
    AuditFailed,
}

/// Structured error carried in a failure envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable error message, surfaced verbatim to callers.
    pub message: String,
    /// Whether the caller may sensibly re-dispatch with an incremented
    /// attempt.
    pub retryable: bool,
    /// Additional context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl WorkflowError {
    /// Registry lookup miss for `workflow_id`.
    pub fn unknown_workflow(workflow_id: &str) -> Self {
        Self {
            code: ErrorCode::UnknownWorkflow,
            message: format!("unknown workflow: '{workflow_id}'"),
            retryable: false,
            details: None,
        }
    }

    /// A local handler failed.
    pub fn execution_error(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ExecutionError,
            message: message.into(),
            retryable: false,
            details: None,
        }
    }

    /// The remote engine call failed (transient by default).
    pub fn remote_call_failed(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::RemoteCallFailed,
            message: message.into(),
            retryable: true,
            details: None,
        }
    }

    /// Audit-side failure.
    pub fn audit_failed(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::AuditFailed,
            message: message.into(),
            retryable: false,
            details: None,
        }
    }

    /// Attach additional context.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_input() -> WorkflowInput {
        WorkflowInput {
            action: "audit".to_string(),
            payload: Map::from_iter([("depth".to_string(), json!(3))]),
            context: InputContext {
                user_id: "user-1".to_string(),
                trace_id: "trace-abc".to_string(),
                requested_at: Utc::now(),
                source_service: SourceService::Bilko,
                attempt: 1,
            },
        }
    }

    #[test]
    fn test_input_json_roundtrip() {
        let input = sample_input();
        let json_str = serde_json::to_string(&input).unwrap();
        let parsed: WorkflowInput = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.action, "audit");
        assert_eq!(parsed.context.trace_id, "trace-abc");
        assert_eq!(parsed.context.attempt, 1);
    }

    #[test]
    fn test_source_service_wire_names() {
        assert_eq!(
            serde_json::to_string(&SourceService::ReplitShell).unwrap(),
            "\"replit-shell\""
        );
        assert_eq!(
            serde_json::to_string(&SourceService::Bilko).unwrap(),
            "\"bilko\""
        );
        assert_eq!(serde_json::to_string(&SourceService::N8n).unwrap(), "\"n8n\"");
    }

    #[test]
    fn test_attempt_defaults_to_one() {
        let json_str = json!({
            "user_id": "u",
            "trace_id": "t",
            "requested_at": "2026-01-01T00:00:00Z",
            "source_service": "n8n",
        })
        .to_string();
        let ctx: InputContext = serde_json::from_str(&json_str).unwrap();
        assert_eq!(ctx.attempt, 1);
    }

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::UnknownWorkflow).unwrap(),
            "\"UNKNOWN_WORKFLOW\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::RemoteCallFailed).unwrap(),
            "\"REMOTE_CALL_FAILED\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::ExecutionError).unwrap(),
            "\"EXECUTION_ERROR\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::AuditFailed).unwrap(),
            "\"AUDIT_FAILED\""
        );
    }

    #[test]
    fn test_output_ok_populates_data_only() {
        let out = WorkflowOutput::ok(
            Map::from_iter([("findings".to_string(), json!([]))]),
            OutputMetadata {
                workflow_id: "rules-audit".to_string(),
                execution_id: None,
                executed_at: Utc::now(),
                duration_ms: 12,
            },
        );
        assert!(out.success);
        assert!(out.data.is_some());
        assert!(out.error.is_none());
    }

    #[test]
    fn test_output_err_populates_error_only() {
        let out = WorkflowOutput::err(
            WorkflowError::unknown_workflow("nope"),
            OutputMetadata {
                workflow_id: "nope".to_string(),
                execution_id: None,
                executed_at: Utc::now(),
                duration_ms: 0,
            },
        );
        assert!(!out.success);
        assert!(out.data.is_none());
        let err = out.error.unwrap();
        assert_eq!(err.code, ErrorCode::UnknownWorkflow);
        assert!(!err.retryable);
        assert!(err.message.contains("nope"));
    }

    #[test]
    fn test_remote_call_failed_is_retryable() {
        let err = WorkflowError::remote_call_failed("connection refused");
        assert!(err.retryable);
        assert_eq!(err.code, ErrorCode::RemoteCallFailed);
    }

    #[test]
    fn test_error_with_details() {
        let err = WorkflowError::execution_error("boom").with_details(json!({"step": 2}));
        let json_str = serde_json::to_string(&err).unwrap();
        assert!(json_str.contains("\"step\":2"));
    }
}
