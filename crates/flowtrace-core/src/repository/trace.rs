//! Trace repository trait definition.
//!
//! Defines the storage interface for the append-only communication trace
//! store. The infrastructure layer (flowtrace-infra) implements this trait
//! with SQLite persistence. Rows are created once at dispatch time and
//! completed exactly once; they are never deleted.
//!
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

use flowtrace_types::error::RepositoryError;
use flowtrace_types::trace::{CommunicationTrace, TraceCompletion};
use uuid::Uuid;

/// Repository trait for communication trace persistence.
pub trait TraceRepository: Send + Sync {
    /// Append a new trace row. Fails with `Conflict` if a row already
    /// exists for the same `(trace_id, attempt_number)`.
    fn create_trace(
        &self,
        trace: &CommunicationTrace,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Apply the one-shot completion mutation to an in-progress trace.
    ///
    /// Fails with `NotFound` if the row does not exist or has already
    /// been completed.
    fn complete_trace(
        &self,
        id: &Uuid,
        completion: &TraceCompletion,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a trace by its row id.
    fn get_trace(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<CommunicationTrace>, RepositoryError>> + Send;

    /// Get one attempt row by its composite correlation key.
    fn get_attempt(
        &self,
        trace_id: &str,
        attempt_number: u32,
    ) -> impl std::future::Future<Output = Result<Option<CommunicationTrace>, RepositoryError>> + Send;

    /// List all attempts sharing a correlation id, ordered by attempt number.
    fn list_for_trace_id(
        &self,
        trace_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<CommunicationTrace>, RepositoryError>> + Send;

    /// List all traces collected for one execution, ordered by requested_at
    /// ascending (the order the step validator consumes them in).
    fn list_for_execution(
        &self,
        execution_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<CommunicationTrace>, RepositoryError>> + Send;
}
