//! Workflow registry: the static catalog of dispatchable workflows.
//!
//! Maps a workflow id to its execution target -- a closed
//! [`WorkflowKind`] enum with exactly two cases, dispatched by pattern
//! match. There is no fallback and no dynamic inference: an id is either
//! registered or the router reports `UNKNOWN_WORKFLOW`.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::executor::local::LocalHandler;

/// Reference to a remote webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointRef {
    /// Name of an environment variable holding the webhook URL.
    EnvVar(String),
    /// A literal webhook URL.
    Url(String),
}

impl EndpointRef {
    /// Resolve to an actual URL. Env-var references return `None` when the
    /// variable is unset or empty.
    pub fn resolve(&self) -> Option<String> {
        match self {
            EndpointRef::EnvVar(name) => match std::env::var(name) {
                Ok(url) if !url.trim().is_empty() => Some(url),
                _ => None,
            },
            EndpointRef::Url(url) => Some(url.clone()),
        }
    }
}

/// How a registered workflow executes.
#[derive(Clone)]
pub enum WorkflowKind {
    /// In-process handler invocation.
    Local(Arc<dyn LocalHandler>),
    /// Remote engine invocation through a webhook.
    Remote(EndpointRef),
}

impl WorkflowKind {
    /// The destination service name recorded on traces.
    pub fn destination(&self) -> &'static str {
        match self {
            WorkflowKind::Local(_) => "local",
            WorkflowKind::Remote(_) => "n8n",
        }
    }
}

impl fmt::Debug for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowKind::Local(_) => f.write_str("WorkflowKind::Local(..)"),
            WorkflowKind::Remote(endpoint) => {
                write!(f, "WorkflowKind::Remote({endpoint:?})")
            }
        }
    }
}

/// Thread-safe catalog of workflow id -> execution target.
#[derive(Default)]
pub struct WorkflowRegistry {
    entries: DashMap<String, WorkflowKind>,
}

impl WorkflowRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register a local in-process workflow. Replaces any previous entry.
    pub fn register_local(&self, workflow_id: &str, handler: Arc<dyn LocalHandler>) {
        tracing::info!(workflow_id, mode = "local", "registered workflow");
        self.entries
            .insert(workflow_id.to_string(), WorkflowKind::Local(handler));
    }

    /// Register a remote webhook-backed workflow. Replaces any previous
    /// entry.
    pub fn register_remote(&self, workflow_id: &str, endpoint: EndpointRef) {
        tracing::info!(workflow_id, mode = "n8n", "registered workflow");
        self.entries
            .insert(workflow_id.to_string(), WorkflowKind::Remote(endpoint));
    }

    /// Look up a workflow's execution target.
    pub fn get(&self, workflow_id: &str) -> Option<WorkflowKind> {
        self.entries.get(workflow_id).map(|r| r.value().clone())
    }

    /// Whether a workflow id is registered.
    pub fn contains(&self, workflow_id: &str) -> bool {
        self.entries.contains_key(workflow_id)
    }

    /// All registered workflow ids.
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of registered workflows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::local::FnHandler;
    use flowtrace_types::envelope::{OutputMetadata, WorkflowInput, WorkflowOutput};
    use serde_json::Map;

    fn noop_handler() -> Arc<dyn LocalHandler> {
        Arc::new(FnHandler::new(|_input: WorkflowInput| async move {
            Ok(WorkflowOutput::ok(Map::new(), OutputMetadata::stamp("noop")))
        }))
    }

    #[test]
    fn test_register_and_get() {
        let registry = WorkflowRegistry::new();
        registry.register_local("rules-audit", noop_handler());
        registry.register_remote(
            "echo-test",
            EndpointRef::EnvVar("N8N_ECHO_TEST_URL".to_string()),
        );

        assert_eq!(registry.len(), 2);
        assert!(matches!(
            registry.get("rules-audit"),
            Some(WorkflowKind::Local(_))
        ));
        assert!(matches!(
            registry.get("echo-test"),
            Some(WorkflowKind::Remote(_))
        ));
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_destination_names() {
        assert_eq!(WorkflowKind::Local(noop_handler()).destination(), "local");
        assert_eq!(
            WorkflowKind::Remote(EndpointRef::Url("https://x".to_string())).destination(),
            "n8n"
        );
    }

    #[test]
    fn test_reregistration_replaces() {
        let registry = WorkflowRegistry::new();
        registry.register_remote("wf", EndpointRef::Url("https://a".to_string()));
        registry.register_local("wf", noop_handler());

        assert_eq!(registry.len(), 1);
        assert!(matches!(registry.get("wf"), Some(WorkflowKind::Local(_))));
    }

    #[test]
    fn test_endpoint_ref_resolve_literal() {
        let endpoint = EndpointRef::Url("https://n8n.local/webhook/echo".to_string());
        assert_eq!(
            endpoint.resolve().as_deref(),
            Some("https://n8n.local/webhook/echo")
        );
    }

    #[test]
    fn test_endpoint_ref_resolve_env() {
        // Unset variable resolves to None
        let endpoint = EndpointRef::EnvVar("FLOWTRACE_TEST_NO_SUCH_VAR".to_string());
        assert!(endpoint.resolve().is_none());

        unsafe { std::env::set_var("FLOWTRACE_TEST_REGISTRY_VAR", "https://env.example/hook") };
        let endpoint = EndpointRef::EnvVar("FLOWTRACE_TEST_REGISTRY_VAR".to_string());
        assert_eq!(
            endpoint.resolve().as_deref(),
            Some("https://env.example/hook")
        );
        unsafe { std::env::remove_var("FLOWTRACE_TEST_REGISTRY_VAR") };
    }

    #[test]
    fn test_ids_listing() {
        let registry = WorkflowRegistry::new();
        registry.register_local("a", noop_handler());
        registry.register_local("b", noop_handler());

        let mut ids = registry.ids();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
