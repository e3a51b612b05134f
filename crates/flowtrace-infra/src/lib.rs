//! Infrastructure implementations for Flowtrace.
//!
//! Implements the ports defined in `flowtrace-core`: SQLite-backed trace
//! and execution stores, the reqwest n8n client behind the remote engine
//! port, the filesystem manifest store, and the TOML config layer.

pub mod config;
pub mod manifest;
pub mod n8n;
pub mod sqlite;
