//! Observability setup for Flowtrace.

pub mod tracing_setup;
