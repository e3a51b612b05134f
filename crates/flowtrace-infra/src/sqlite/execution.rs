//! SQLite workflow execution repository implementation.
//!
//! Implements `ExecutionRepository` from `flowtrace-core` using sqlx with
//! split read/write pools. One row per end-to-end run; terminal status
//! updates set `completed_at` and store the final output envelope.

use flowtrace_core::repository::ExecutionRepository;
use flowtrace_types::error::RepositoryError;
use flowtrace_types::execution::{ExecutionStatus, WorkflowExecution};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ExecutionRepository`.
pub struct SqliteExecutionRepository {
    pool: DatabasePool,
}

impl SqliteExecutionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct ExecutionRow {
    id: String,
    workflow_id: String,
    external_execution_id: Option<String>,
    status: String,
    started_at: String,
    completed_at: Option<String>,
    trigger_trace_id: String,
    final_output: Option<String>,
    user_id: Option<String>,
    metadata: String,
}

impl ExecutionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            external_execution_id: row.try_get("external_execution_id")?,
            status: row.try_get("status")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            trigger_trace_id: row.try_get("trigger_trace_id")?,
            final_output: row.try_get("final_output")?,
            user_id: row.try_get("user_id")?,
            metadata: row.try_get("metadata")?,
        })
    }

    fn into_execution(self) -> Result<WorkflowExecution, RepositoryError> {
        let id = parse_uuid(&self.id)?;

        let status: ExecutionStatus =
            serde_json::from_value(serde_json::Value::String(self.status.clone())).map_err(
                |_| RepositoryError::Query(format!("invalid execution status: {}", self.status)),
            )?;

        let started_at = parse_datetime(&self.started_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        let final_output = self
            .final_output
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid final_output: {e}")))
            })
            .transpose()?;

        let metadata: serde_json::Value = serde_json::from_str(&self.metadata)
            .map_err(|e| RepositoryError::Query(format!("invalid metadata JSON: {e}")))?;

        Ok(WorkflowExecution {
            id,
            workflow_id: self.workflow_id,
            external_execution_id: self.external_execution_id,
            status,
            started_at,
            completed_at,
            trigger_trace_id: self.trigger_trace_id,
            final_output,
            user_id: self.user_id,
            metadata,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn status_str(status: ExecutionStatus) -> Result<String, RepositoryError> {
    serde_json::to_value(status)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .as_str()
        .map(String::from)
        .ok_or_else(|| RepositoryError::Query("non-string execution status".to_string()))
}

// ---------------------------------------------------------------------------
// ExecutionRepository impl
// ---------------------------------------------------------------------------

impl ExecutionRepository for SqliteExecutionRepository {
    async fn create_execution(&self, execution: &WorkflowExecution) -> Result<(), RepositoryError> {
        let final_output = execution
            .final_output
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("serialize final_output: {e}")))?;

        let metadata = serde_json::to_string(&execution.metadata)
            .map_err(|e| RepositoryError::Query(format!("serialize metadata: {e}")))?;

        sqlx::query(
            r#"INSERT INTO workflow_executions
               (id, workflow_id, external_execution_id, status, started_at,
                completed_at, trigger_trace_id, final_output, user_id, metadata)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(execution.id.to_string())
        .bind(&execution.workflow_id)
        .bind(&execution.external_execution_id)
        .bind(status_str(execution.status)?)
        .bind(format_datetime(&execution.started_at))
        .bind(execution.completed_at.as_ref().map(format_datetime))
        .bind(&execution.trigger_trace_id)
        .bind(&final_output)
        .bind(&execution.user_id)
        .bind(&metadata)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_execution(
        &self,
        id: &Uuid,
    ) -> Result<Option<WorkflowExecution>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflow_executions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = ExecutionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_execution()?))
            }
            None => Ok(None),
        }
    }

    async fn find_by_trigger(
        &self,
        trigger_trace_id: &str,
        workflow_id: &str,
    ) -> Result<Option<WorkflowExecution>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM workflow_executions WHERE trigger_trace_id = ? AND workflow_id = ? ORDER BY started_at ASC LIMIT 1",
        )
        .bind(trigger_trace_id)
        .bind(workflow_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = ExecutionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_execution()?))
            }
            None => Ok(None),
        }
    }

    async fn update_status(
        &self,
        id: &Uuid,
        status: ExecutionStatus,
        final_output: Option<&serde_json::Value>,
    ) -> Result<(), RepositoryError> {
        let completed_at = if status.is_terminal() {
            Some(format_datetime(&Utc::now()))
        } else {
            None
        };

        let final_output_str = final_output
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("serialize final_output: {e}")))?;

        let result = sqlx::query(
            "UPDATE workflow_executions SET status = ?, completed_at = COALESCE(?, completed_at), final_output = COALESCE(?, final_output) WHERE id = ?",
        )
        .bind(status_str(status)?)
        .bind(&completed_at)
        .bind(&final_output_str)
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn set_external_execution_id(
        &self,
        id: &Uuid,
        external_id: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE workflow_executions SET external_execution_id = ? WHERE id = ?")
                .bind(external_id)
                .bind(id.to_string())
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_for_workflow(
        &self,
        workflow_id: &str,
        limit: u32,
    ) -> Result<Vec<WorkflowExecution>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM workflow_executions WHERE workflow_id = ? ORDER BY started_at DESC LIMIT ?",
        )
        .bind(workflow_id)
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut executions = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = ExecutionRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            executions.push(r.into_execution()?);
        }
        Ok(executions)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
