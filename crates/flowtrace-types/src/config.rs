//! Global configuration schema.
//!
//! Deserialized from `config.toml` in the data directory. Every field has
//! a default so a missing or partial file still yields a usable config.

use serde::{Deserialize, Serialize};

/// Top-level Flowtrace configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowtraceConfig {
    /// Directory holding audit manifests. Relative paths are resolved
    /// against the data directory; defaults to `{data_dir}/manifests`.
    #[serde(default)]
    pub manifest_dir: Option<String>,

    /// Per-request timeout for remote engine calls, in seconds.
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,

    /// Base URL of the n8n REST API, for execution status polling.
    #[serde(default)]
    pub n8n_base_url: Option<String>,

    /// Remote workflows to register at startup.
    #[serde(default)]
    pub remote_workflows: Vec<RemoteWorkflowConfig>,
}

fn default_remote_timeout_secs() -> u64 {
    30
}

impl Default for FlowtraceConfig {
    fn default() -> Self {
        Self {
            manifest_dir: None,
            remote_timeout_secs: default_remote_timeout_secs(),
            n8n_base_url: None,
            remote_workflows: Vec::new(),
        }
    }
}

/// One remote workflow registration.
///
/// Exactly one of `endpoint_env` / `url` should be set; when both are,
/// the environment variable reference wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteWorkflowConfig {
    /// Workflow id to register.
    pub id: String,
    /// Environment variable holding the webhook URL.
    #[serde(default)]
    pub endpoint_env: Option<String>,
    /// Literal webhook URL.
    #[serde(default)]
    pub url: Option<String>,
}
