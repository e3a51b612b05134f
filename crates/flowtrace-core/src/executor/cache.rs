//! Process-lifetime webhook URL cache.
//!
//! Maps workflow ids to previously-discovered webhook URLs so the remote
//! executor can skip endpoint re-resolution. No persistence, no TTL;
//! last-write-wins. An explicit, injectable object (not a module-level
//! singleton) backed by `DashMap`, so concurrent access is safe under the
//! multi-threaded runtime.

use std::sync::Arc;

use dashmap::DashMap;

/// Thread-safe workflow-id -> webhook-URL cache.
#[derive(Clone, Default)]
pub struct WebhookUrlCache {
    urls: Arc<DashMap<String, String>>,
}

impl WebhookUrlCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            urls: Arc::new(DashMap::new()),
        }
    }

    /// Store a webhook URL for a workflow. Replaces any previous value.
    pub fn set_webhook_url(&self, workflow_id: &str, url: &str) {
        tracing::debug!(workflow_id, url, "cached webhook URL");
        self.urls.insert(workflow_id.to_string(), url.to_string());
    }

    /// Look up the cached webhook URL for a workflow.
    pub fn get_webhook_url(&self, workflow_id: &str) -> Option<String> {
        self.urls.get(workflow_id).map(|r| r.value().clone())
    }

    /// Drop every cached URL.
    pub fn clear_webhook_cache(&self) {
        self.urls.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
