//! Execution repository trait definition.
//!
//! Defines the storage interface for workflow execution lifecycle records.
//! Executions are created `running` by the router, optionally annotated with
//! the remote engine's own id, and completed exactly once with a terminal
//! status and final output.

use flowtrace_types::error::RepositoryError;
use flowtrace_types::execution::{ExecutionStatus, WorkflowExecution};
use uuid::Uuid;

/// Repository trait for workflow execution persistence.
pub trait ExecutionRepository: Send + Sync {
    /// Create a new execution record.
    fn create_execution(
        &self,
        execution: &WorkflowExecution,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get an execution by id.
    fn get_execution(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowExecution>, RepositoryError>> + Send;

    /// Find the execution triggered by a given correlation id for a
    /// workflow, if one exists (retry attempts share the execution).
    fn find_by_trigger(
        &self,
        trigger_trace_id: &str,
        workflow_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowExecution>, RepositoryError>> + Send;

    /// Move an execution to a new status. Terminal statuses set
    /// `completed_at` and store the final output envelope.
    fn update_status(
        &self,
        id: &Uuid,
        status: ExecutionStatus,
        final_output: Option<&serde_json::Value>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Record the id the remote engine assigned to this execution.
    fn set_external_execution_id(
        &self,
        id: &Uuid,
        external_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List executions for a workflow, newest first.
    fn list_for_workflow(
        &self,
        workflow_id: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowExecution>, RepositoryError>> + Send;
}
