//! Global configuration loader for Flowtrace.
//!
//! Reads `config.toml` from the data directory (`~/.flowtrace/` in
//! production) and deserializes it into [`FlowtraceConfig`]. Falls back to
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use flowtrace_types::config::{FlowtraceConfig, RemoteWorkflowConfig};
use flowtrace_core::registry::EndpointRef;

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`FlowtraceConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> FlowtraceConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return FlowtraceConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return FlowtraceConfig::default();
        }
    };

    match toml::from_str::<FlowtraceConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            FlowtraceConfig::default()
        }
    }
}

/// Resolve the data directory from `FLOWTRACE_DATA_DIR`, falling back to
/// `~/.flowtrace`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var("FLOWTRACE_DATA_DIR") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".flowtrace"),
    }
}

/// Resolve the manifest directory: the configured path (relative paths are
/// anchored at the data directory), defaulting to `{data_dir}/manifests`.
pub fn resolve_manifest_dir(config: &FlowtraceConfig, data_dir: &Path) -> PathBuf {
    match &config.manifest_dir {
        Some(dir) => {
            let path = PathBuf::from(dir);
            if path.is_absolute() {
                path
            } else {
                data_dir.join(path)
            }
        }
        None => data_dir.join("manifests"),
    }
}

/// Turn a remote workflow config entry into an endpoint reference.
/// The environment variable reference wins when both are set; an entry
/// with neither is rejected.
pub fn endpoint_ref(entry: &RemoteWorkflowConfig) -> Option<EndpointRef> {
    if let Some(env) = &entry.endpoint_env {
        return Some(EndpointRef::EnvVar(env.clone()));
    }
    if let Some(url) = &entry.url {
        return Some(EndpointRef::Url(url.clone()));
    }
    tracing::warn!(
        workflow_id = %entry.id,
        "remote workflow entry has neither endpoint_env nor url, skipping"
    );
    None
}
