//! SQLite persistence for traces and executions.

pub mod execution;
pub mod pool;
pub mod trace;

pub use execution::SqliteExecutionRepository;
pub use pool::DatabasePool;
pub use trace::SqliteTraceRepository;
