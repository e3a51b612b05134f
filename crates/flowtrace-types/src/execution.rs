//! Workflow execution records.
//!
//! A [`WorkflowExecution`] tracks one end-to-end run of a workflow from
//! trigger to terminal status. It is owned and mutated solely by the
//! workflow router; UI pollers read it through the execution store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    /// Whether this status is terminal. `completed_at` is set iff terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// One end-to-end run of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// UUIDv7 execution id.
    pub id: Uuid,
    /// The workflow being executed.
    pub workflow_id: String,
    /// Id assigned by the remote engine, when it returns its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_execution_id: Option<String>,
    /// Current lifecycle status.
    pub status: ExecutionStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Correlation id of the call that started this execution.
    pub trigger_trace_id: String,
    /// Final output envelope, set on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
    /// The user who triggered the run, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Opaque execution metadata.
    #[serde(default)]
    pub metadata: Value,
}

impl WorkflowExecution {
    /// Create a fresh `running` execution for a trigger call.
    pub fn started(workflow_id: &str, trigger_trace_id: &str, user_id: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_id: workflow_id.to_string(),
            external_execution_id: None,
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            trigger_trace_id: trigger_trace_id.to_string(),
            final_output: None,
            user_id,
            metadata: Value::Null,
        }
    }
}
