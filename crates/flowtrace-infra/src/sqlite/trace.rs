//! SQLite communication trace repository implementation.
//!
//! Implements `TraceRepository` from `flowtrace-core` using sqlx with split
//! read/write pools. Rows are append-only: inserted once at dispatch time,
//! mutated exactly once by the completion write, never deleted. The unique
//! index on `(trace_id, attempt_number)` enforces sibling-attempt identity
//! at the storage layer.

use flowtrace_core::repository::TraceRepository;
use flowtrace_types::error::RepositoryError;
use flowtrace_types::trace::{CommunicationTrace, TraceCompletion, TraceStatus};
use chrono::{DateTime, Utc};
use flowtrace_types::envelope::SourceService;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `TraceRepository`.
pub struct SqliteTraceRepository {
    pool: DatabasePool,
}

impl SqliteTraceRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct TraceRow {
    id: String,
    trace_id: String,
    attempt_number: i64,
    execution_id: Option<String>,
    source_service: String,
    destination_service: String,
    workflow_id: String,
    action: Option<String>,
    user_id: String,
    requested_at: String,
    responded_at: Option<String>,
    duration_ms: Option<i64>,
    request_payload: String,
    response_payload: Option<String>,
    overall_status: String,
    error_code: Option<String>,
    error_detail: Option<String>,
}

impl TraceRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            trace_id: row.try_get("trace_id")?,
            attempt_number: row.try_get("attempt_number")?,
            execution_id: row.try_get("execution_id")?,
            source_service: row.try_get("source_service")?,
            destination_service: row.try_get("destination_service")?,
            workflow_id: row.try_get("workflow_id")?,
            action: row.try_get("action")?,
            user_id: row.try_get("user_id")?,
            requested_at: row.try_get("requested_at")?,
            responded_at: row.try_get("responded_at")?,
            duration_ms: row.try_get("duration_ms")?,
            request_payload: row.try_get("request_payload")?,
            response_payload: row.try_get("response_payload")?,
            overall_status: row.try_get("overall_status")?,
            error_code: row.try_get("error_code")?,
            error_detail: row.try_get("error_detail")?,
        })
    }

    fn into_trace(self) -> Result<CommunicationTrace, RepositoryError> {
        let id = parse_uuid(&self.id)?;
        let execution_id = self.execution_id.as_deref().map(parse_uuid).transpose()?;

        let source_service: SourceService = serde_json::from_value(serde_json::Value::String(
            self.source_service.clone(),
        ))
        .map_err(|_| {
            RepositoryError::Query(format!("invalid source service: {}", self.source_service))
        })?;

        let overall_status: TraceStatus = serde_json::from_value(serde_json::Value::String(
            self.overall_status.clone(),
        ))
        .map_err(|_| {
            RepositoryError::Query(format!("invalid trace status: {}", self.overall_status))
        })?;

        let requested_at = parse_datetime(&self.requested_at)?;
        let responded_at = self
            .responded_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        let request_payload: serde_json::Value = serde_json::from_str(&self.request_payload)
            .map_err(|e| RepositoryError::Query(format!("invalid request_payload: {e}")))?;

        let response_payload = self
            .response_payload
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid response_payload: {e}")))
            })
            .transpose()?;

        Ok(CommunicationTrace {
            id,
            trace_id: self.trace_id,
            attempt_number: self.attempt_number as u32,
            execution_id,
            source_service,
            destination_service: self.destination_service,
            workflow_id: self.workflow_id,
            action: self.action,
            user_id: self.user_id,
            requested_at,
            responded_at,
            duration_ms: self.duration_ms.map(|d| d as u64),
            request_payload,
            response_payload,
            overall_status,
            error_code: self.error_code,
            error_detail: self.error_detail,
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

fn status_str(status: TraceStatus) -> Result<String, RepositoryError> {
    serde_json::to_value(status)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .as_str()
        .map(String::from)
        .ok_or_else(|| RepositoryError::Query("non-string trace status".to_string()))
}

fn source_str(source: SourceService) -> Result<String, RepositoryError> {
    serde_json::to_value(source)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .as_str()
        .map(String::from)
        .ok_or_else(|| RepositoryError::Query("non-string source service".to_string()))
}

// ---------------------------------------------------------------------------
// TraceRepository impl
// ---------------------------------------------------------------------------

impl TraceRepository for SqliteTraceRepository {
    async fn create_trace(&self, trace: &CommunicationTrace) -> Result<(), RepositoryError> {
        let request_payload = serde_json::to_string(&trace.request_payload)
            .map_err(|e| RepositoryError::Query(format!("serialize request_payload: {e}")))?;
        let response_payload = trace
            .response_payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("serialize response_payload: {e}")))?;

        let result = sqlx::query(
            r#"INSERT INTO communication_traces
               (id, trace_id, attempt_number, execution_id, source_service,
                destination_service, workflow_id, action, user_id, requested_at,
                responded_at, duration_ms, request_payload, response_payload,
                overall_status, error_code, error_detail)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(trace.id.to_string())
        .bind(&trace.trace_id)
        .bind(trace.attempt_number as i64)
        .bind(trace.execution_id.map(|id| id.to_string()))
        .bind(source_str(trace.source_service)?)
        .bind(&trace.destination_service)
        .bind(&trace.workflow_id)
        .bind(&trace.action)
        .bind(&trace.user_id)
        .bind(format_datetime(&trace.requested_at))
        .bind(trace.responded_at.as_ref().map(format_datetime))
        .bind(trace.duration_ms.map(|d| d as i64))
        .bind(&request_payload)
        .bind(&response_payload)
        .bind(status_str(trace.overall_status)?)
        .bind(&trace.error_code)
        .bind(&trace.error_detail)
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
                Err(RepositoryError::Conflict(format!(
                    "attempt {} of trace '{}' already recorded",
                    trace.attempt_number, trace.trace_id
                )))
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn complete_trace(
        &self,
        id: &Uuid,
        completion: &TraceCompletion,
    ) -> Result<(), RepositoryError> {
        let response_payload = completion
            .response_payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("serialize response_payload: {e}")))?;

        // Guarded to rows not yet completed: the completion write is one-shot.
        let result = sqlx::query(
            r#"UPDATE communication_traces
               SET overall_status = ?, responded_at = ?, duration_ms = ?,
                   response_payload = ?, error_code = ?, error_detail = ?
               WHERE id = ? AND responded_at IS NULL"#,
        )
        .bind(status_str(completion.status)?)
        .bind(format_datetime(&completion.responded_at))
        .bind(completion.duration_ms as i64)
        .bind(&response_payload)
        .bind(&completion.error_code)
        .bind(&completion.error_detail)
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn get_trace(&self, id: &Uuid) -> Result<Option<CommunicationTrace>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM communication_traces WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = TraceRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_trace()?))
            }
            None => Ok(None),
        }
    }

    async fn get_attempt(
        &self,
        trace_id: &str,
        attempt_number: u32,
    ) -> Result<Option<CommunicationTrace>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM communication_traces WHERE trace_id = ? AND attempt_number = ?",
        )
        .bind(trace_id)
        .bind(attempt_number as i64)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = TraceRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_trace()?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_trace_id(
        &self,
        trace_id: &str,
    ) -> Result<Vec<CommunicationTrace>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM communication_traces WHERE trace_id = ? ORDER BY attempt_number ASC",
        )
        .bind(trace_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut traces = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = TraceRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            traces.push(r.into_trace()?);
        }
        Ok(traces)
    }

    async fn list_for_execution(
        &self,
        execution_id: &Uuid,
    ) -> Result<Vec<CommunicationTrace>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM communication_traces WHERE execution_id = ? ORDER BY requested_at ASC",
        )
        .bind(execution_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut traces = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = TraceRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            traces.push(r.into_trace()?);
        }
        Ok(traces)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;
    use serde_json::json;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn sample_trace(trace_id: &str, attempt: u32) -> CommunicationTrace {
        CommunicationTrace {
            id: Uuid::now_v7(),
            trace_id: trace_id.to_string(),
            attempt_number: attempt,
            execution_id: Some(Uuid::now_v7()),
            source_service: SourceService::Bilko,
            destination_service: "n8n".to_string(),
            workflow_id: "echo-test".to_string(),
            action: Some("echo".to_string()),
            user_id: "user-1".to_string(),
            requested_at: Utc::now(),
            responded_at: None,
            duration_ms: None,
            request_payload: json!({"action": "echo"}),
            response_payload: None,
            overall_status: TraceStatus::InProgress,
            error_code: None,
            error_detail: None,
        }
    }

    fn sample_completion(status: TraceStatus) -> TraceCompletion {
        TraceCompletion {
            status,
            responded_at: Utc::now(),
            duration_ms: 42,
            response_payload: Some(json!({"success": true})),
            error_code: None,
            error_detail: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_trace() {
        let repo = SqliteTraceRepository::new(test_pool().await);
        let trace = sample_trace("t-1", 1);

        repo.create_trace(&trace).await.unwrap();

        let loaded = repo.get_trace(&trace.id).await.unwrap().unwrap();
        assert_eq!(loaded.trace_id, "t-1");
        assert_eq!(loaded.attempt_number, 1);
        assert_eq!(loaded.overall_status, TraceStatus::InProgress);
        assert_eq!(loaded.source_service, SourceService::Bilko);
        assert_eq!(loaded.request_payload["action"], "echo");
        assert!(loaded.responded_at.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_attempt_conflicts() {
        let repo = SqliteTraceRepository::new(test_pool().await);
        let trace = sample_trace("t-dup", 1);
        repo.create_trace(&trace).await.unwrap();

        let sibling = sample_trace("t-dup", 1);
        let err = repo.create_trace(&sibling).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_complete_trace_is_one_shot() {
        let repo = SqliteTraceRepository::new(test_pool().await);
        let trace = sample_trace("t-complete", 1);
        repo.create_trace(&trace).await.unwrap();

        repo.complete_trace(&trace.id, &sample_completion(TraceStatus::Success))
            .await
            .unwrap();

        let loaded = repo.get_trace(&trace.id).await.unwrap().unwrap();
        assert_eq!(loaded.overall_status, TraceStatus::Success);
        assert!(loaded.responded_at.is_some());
        assert_eq!(loaded.duration_ms, Some(42));
        assert_eq!(loaded.response_payload.unwrap()["success"], json!(true));

        // Second completion targets an already-responded row
        let err = repo
            .complete_trace(&trace.id, &sample_completion(TraceStatus::Failed))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_complete_missing_trace_not_found() {
        let repo = SqliteTraceRepository::new(test_pool().await);
        let err = repo
            .complete_trace(&Uuid::now_v7(), &sample_completion(TraceStatus::Success))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_get_attempt_by_composite_key() {
        let repo = SqliteTraceRepository::new(test_pool().await);
        repo.create_trace(&sample_trace("t-multi", 1)).await.unwrap();
        repo.create_trace(&sample_trace("t-multi", 2)).await.unwrap();

        let second = repo.get_attempt("t-multi", 2).await.unwrap().unwrap();
        assert_eq!(second.attempt_number, 2);

        let missing = repo.get_attempt("t-multi", 3).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_for_trace_id_orders_by_attempt() {
        let repo = SqliteTraceRepository::new(test_pool().await);
        repo.create_trace(&sample_trace("t-order", 2)).await.unwrap();
        repo.create_trace(&sample_trace("t-order", 1)).await.unwrap();

        let attempts = repo.list_for_trace_id("t-order").await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].attempt_number, 1);
        assert_eq!(attempts[1].attempt_number, 2);
    }

    #[tokio::test]
    async fn test_list_for_execution_orders_by_requested_at() {
        let repo = SqliteTraceRepository::new(test_pool().await);
        let execution_id = Uuid::now_v7();

        let mut first = sample_trace("t-ex-1", 1);
        first.execution_id = Some(execution_id);
        first.requested_at = Utc::now() - chrono::Duration::seconds(10);
        let mut second = sample_trace("t-ex-2", 1);
        second.execution_id = Some(execution_id);
        let mut unrelated = sample_trace("t-ex-3", 1);
        unrelated.execution_id = Some(Uuid::now_v7());

        repo.create_trace(&second).await.unwrap();
        repo.create_trace(&first).await.unwrap();
        repo.create_trace(&unrelated).await.unwrap();

        let traces = repo.list_for_execution(&execution_id).await.unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].trace_id, "t-ex-1");
        assert_eq!(traces[1].trace_id, "t-ex-2");
    }
}
