//! The workflow router.
//!
//! Single entry point for workflow dispatch. The router looks the workflow
//! up in the [`WorkflowRegistry`], records the call as a
//! [`CommunicationTrace`], creates (or re-joins) the
//! [`WorkflowExecution`] lifecycle record, dispatches by [`WorkflowKind`],
//! and completes both records from the output envelope. Dispatch is total:
//! every path returns a [`WorkflowOutput`], never a transport error.
//!
//! An unknown workflow id is answered with `UNKNOWN_WORKFLOW` before any
//! row is written; there is nothing to trace when no dispatch happens.
//! Persistence failures after dispatch has started are logged and do not
//! mask the workflow's own result.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use flowtrace_types::envelope::{OutputMetadata, WorkflowError, WorkflowInput, WorkflowOutput};
use flowtrace_types::execution::{ExecutionStatus, WorkflowExecution};
use flowtrace_types::trace::{CommunicationTrace, TraceCompletion, TraceStatus};

use crate::executor::remote::RemoteEngine;
use crate::executor::{LocalExecutor, RemoteExecutor, WebhookUrlCache};
use crate::registry::{WorkflowKind, WorkflowRegistry};
use crate::repository::{ExecutionRepository, TraceRepository};

/// Routes workflow inputs to their registered executor and records the
/// call in the trace and execution stores.
pub struct WorkflowRouter<T, X, E>
where
    T: TraceRepository,
    X: ExecutionRepository,
    E: RemoteEngine,
{
    registry: Arc<WorkflowRegistry>,
    traces: T,
    executions: X,
    remote: RemoteExecutor<E>,
}

impl<T, X, E> WorkflowRouter<T, X, E>
where
    T: TraceRepository,
    X: ExecutionRepository,
    E: RemoteEngine,
{
    /// Wire a router over its registry, stores, and remote executor.
    pub fn new(
        registry: Arc<WorkflowRegistry>,
        traces: T,
        executions: X,
        remote: RemoteExecutor<E>,
    ) -> Self {
        Self {
            registry,
            traces,
            executions,
            remote,
        }
    }

    /// The workflow registry this router dispatches against.
    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    /// The remote executor's webhook URL cache.
    pub fn webhook_cache(&self) -> &WebhookUrlCache {
        self.remote.cache()
    }

    /// Dispatch one input envelope to `workflow_id`.
    ///
    /// Always returns an output envelope; failures are encoded in it.
    pub async fn dispatch(&self, workflow_id: &str, input: WorkflowInput) -> WorkflowOutput {
        let Some(kind) = self.registry.get(workflow_id) else {
            tracing::warn!(workflow_id, "dispatch to unknown workflow");
            return WorkflowOutput::err(
                WorkflowError::unknown_workflow(workflow_id),
                OutputMetadata::stamp(workflow_id),
            );
        };

        tracing::info!(
            workflow_id,
            trace_id = %input.context.trace_id,
            attempt = input.context.attempt,
            destination = kind.destination(),
            "dispatching workflow"
        );

        let execution = self.open_execution(workflow_id, &input).await;
        let trace = self.open_trace(workflow_id, &kind, &input, execution.as_ref()).await;

        let mut output = match &kind {
            WorkflowKind::Local(handler) => {
                match LocalExecutor::run(handler.as_ref(), workflow_id, input).await {
                    Ok(output) => output,
                    Err(err) => {
                        tracing::error!(workflow_id, error = %err, "local handler failed");
                        WorkflowOutput::err(
                            WorkflowError::execution_error(err.to_string()),
                            OutputMetadata::stamp(workflow_id),
                        )
                    }
                }
            }
            WorkflowKind::Remote(endpoint) => {
                self.remote.call(workflow_id, endpoint, &input).await
            }
        };

        if let Some(execution) = &execution {
            // The remote engine's own id, when it reported one, is kept on
            // the execution row; the envelope carries our execution id.
            if let Some(external_id) = output.metadata.execution_id.take() {
                if let Err(err) = self
                    .executions
                    .set_external_execution_id(&execution.id, &external_id)
                    .await
                {
                    tracing::error!(
                        execution_id = %execution.id,
                        error = %err,
                        "failed to record external execution id"
                    );
                }
            }
            output.metadata.execution_id = Some(execution.id.to_string());
        }

        if let Some(trace) = &trace {
            self.close_trace(trace, &output).await;
        }
        if let Some(execution) = &execution {
            self.close_execution(execution, &output).await;
        }

        output
    }

    /// Find the execution already opened for this trigger, or open a new
    /// `running` one. Retry attempts of the same trace id re-join the
    /// original execution.
    async fn open_execution(
        &self,
        workflow_id: &str,
        input: &WorkflowInput,
    ) -> Option<WorkflowExecution> {
        match self
            .executions
            .find_by_trigger(&input.context.trace_id, workflow_id)
            .await
        {
            Ok(Some(existing)) => return Some(existing),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(workflow_id, error = %err, "execution lookup failed");
                return None;
            }
        }

        let execution = WorkflowExecution::started(
            workflow_id,
            &input.context.trace_id,
            Some(input.context.user_id.clone()),
        );
        match self.executions.create_execution(&execution).await {
            Ok(()) => Some(execution),
            Err(err) => {
                tracing::error!(workflow_id, error = %err, "failed to create execution record");
                None
            }
        }
    }

    /// Append the in-progress trace row for this dispatch.
    async fn open_trace(
        &self,
        workflow_id: &str,
        kind: &WorkflowKind,
        input: &WorkflowInput,
        execution: Option<&WorkflowExecution>,
    ) -> Option<CommunicationTrace> {
        let trace = CommunicationTrace {
            id: Uuid::now_v7(),
            trace_id: input.context.trace_id.clone(),
            attempt_number: input.context.attempt,
            execution_id: execution.map(|e| e.id),
            source_service: input.context.source_service,
            destination_service: kind.destination().to_string(),
            workflow_id: workflow_id.to_string(),
            action: Some(input.action.clone()),
            user_id: input.context.user_id.clone(),
            requested_at: Utc::now(),
            responded_at: None,
            duration_ms: None,
            request_payload: serde_json::to_value(input).unwrap_or(Value::Null),
            response_payload: None,
            overall_status: TraceStatus::InProgress,
            error_code: None,
            error_detail: None,
        };

        match self.traces.create_trace(&trace).await {
            Ok(()) => Some(trace),
            Err(err) => {
                tracing::error!(
                    workflow_id,
                    trace_id = %trace.trace_id,
                    attempt = trace.attempt_number,
                    error = %err,
                    "failed to append trace row"
                );
                None
            }
        }
    }

    /// Apply the one-shot completion write to the trace row.
    async fn close_trace(&self, trace: &CommunicationTrace, output: &WorkflowOutput) {
        let responded_at = Utc::now();
        let completion = TraceCompletion {
            status: if output.success {
                TraceStatus::Success
            } else {
                TraceStatus::Failed
            },
            responded_at,
            duration_ms: (responded_at - trace.requested_at).num_milliseconds().max(0) as u64,
            response_payload: serde_json::to_value(output).ok(),
            error_code: output
                .error
                .as_ref()
                .and_then(|e| serde_json::to_value(e.code).ok())
                .and_then(|v| v.as_str().map(String::from)),
            error_detail: output.error.as_ref().map(|e| e.message.clone()),
        };

        if let Err(err) = self.traces.complete_trace(&trace.id, &completion).await {
            tracing::error!(trace_row = %trace.id, error = %err, "failed to complete trace row");
        }
    }

    /// Move the execution to its terminal status with the final output.
    async fn close_execution(&self, execution: &WorkflowExecution, output: &WorkflowOutput) {
        let status = if output.success {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        let final_output = serde_json::to_value(output).ok();

        if let Err(err) = self
            .executions
            .update_status(&execution.id, status, final_output.as_ref())
            .await
        {
            tracing::error!(execution_id = %execution.id, error = %err, "failed to complete execution");
        }
    }
}
