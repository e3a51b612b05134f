//! REST API request handlers.

pub mod audit;
pub mod execution;
pub mod workflow;
