//! Communication trace records.
//!
//! A [`CommunicationTrace`] is the append-only audit record of one
//! outbound/inbound service call. Rows are created at dispatch time with
//! status `in_progress` and mutated exactly once on completion; they are
//! never deleted. Retries of the same logical call are independent sibling
//! rows keyed by the composite `(trace_id, attempt_number)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::envelope::SourceService;

/// Overall status of a communication trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

impl TraceStatus {
    /// Whether this status is terminal (the completion write has happened).
    pub fn is_terminal(self) -> bool {
        matches!(self, TraceStatus::Success | TraceStatus::Failed)
    }
}

/// One recorded service call, correlated by `(trace_id, attempt_number)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationTrace {
    /// UUIDv7 row id, generated at creation.
    pub id: Uuid,
    /// Caller-supplied correlation id, shared across retries.
    pub trace_id: String,
    /// Attempt number (1-based) within the correlation id.
    pub attempt_number: u32,
    /// Back-reference to the execution this call belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,
    /// Which service originated the call.
    pub source_service: SourceService,
    /// Where the call was dispatched ("local" or "n8n").
    pub destination_service: String,
    /// The workflow being invoked.
    pub workflow_id: String,
    /// The action requested, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// The user on whose behalf the call was made.
    pub user_id: String,
    /// When the call was dispatched.
    pub requested_at: DateTime<Utc>,
    /// When the response arrived (None until completion).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    /// `responded_at - requested_at`, computed at completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Opaque request payload snapshot.
    pub request_payload: Value,
    /// Opaque response payload snapshot (None until completion).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_payload: Option<Value>,
    /// Overall status of the call.
    pub overall_status: TraceStatus,
    /// Machine-readable error code on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error detail on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// The one-shot completion mutation applied to an in-progress trace.
#[derive(Debug, Clone)]
pub struct TraceCompletion {
    /// Final status (`Success` or `Failed`).
    pub status: TraceStatus,
    /// When the response arrived.
    pub responded_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Response payload snapshot.
    pub response_payload: Option<Value>,
    /// Error code on failure.
    pub error_code: Option<String>,
    /// Error detail on failure.
    pub error_detail: Option<String>,
}
