//! n8n remote engine integration.

pub mod client;

pub use client::N8nClient;
