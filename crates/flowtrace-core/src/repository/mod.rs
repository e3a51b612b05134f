//! Storage port definitions implemented by `flowtrace-infra`.

pub mod execution;
pub mod trace;

pub use execution::ExecutionRepository;
pub use trace::TraceRepository;
