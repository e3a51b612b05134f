//! Workflow routing, execution, and audit logic for Flowtrace.
//!
//! This crate defines the "ports" (repository, remote engine, and manifest
//! store traits) that the infrastructure layer implements, plus the logic
//! built on top of them: the workflow registry, the dispatch router, the
//! local and remote executors, and the step validator. It depends only on
//! `flowtrace-types` -- never on `flowtrace-infra` or any database/IO crate.

pub mod audit;
pub mod executor;
pub mod registry;
pub mod repository;
pub mod router;
