//! Shared domain types for Flowtrace.
//!
//! This crate contains the core domain types used across the Flowtrace
//! platform: the workflow input/output envelopes, communication traces,
//! execution records, audit manifests, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod envelope;
pub mod error;
pub mod execution;
pub mod manifest;
pub mod trace;
