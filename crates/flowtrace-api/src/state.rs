//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! The router and audit service are generic over repository/engine/store
//! traits, but AppState pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use flowtrace_core::audit::AuditService;
use flowtrace_core::executor::{FnHandler, RemoteExecutor, WebhookUrlCache};
use flowtrace_core::registry::WorkflowRegistry;
use flowtrace_core::router::WorkflowRouter;
use flowtrace_infra::config::{endpoint_ref, load_config, resolve_data_dir, resolve_manifest_dir};
use flowtrace_infra::manifest::FsManifestStore;
use flowtrace_infra::n8n::N8nClient;
use flowtrace_infra::sqlite::{DatabasePool, SqliteExecutionRepository, SqliteTraceRepository};
use flowtrace_types::config::FlowtraceConfig;
use flowtrace_types::envelope::{OutputMetadata, WorkflowInput, WorkflowOutput};

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteRouter =
    WorkflowRouter<SqliteTraceRepository, SqliteExecutionRepository, N8nClient>;

pub type ConcreteAuditService = AuditService<FsManifestStore>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ConcreteRouter>,
    pub audit: Arc<ConcreteAuditService>,
    pub trace_repo: Arc<SqliteTraceRepository>,
    pub execution_repo: Arc<SqliteExecutionRepository>,
    pub config: FlowtraceConfig,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        // Initialize database
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("flowtrace.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let config = load_config(&data_dir).await;

        // Build the workflow catalog: built-in local handlers plus the
        // remote entries declared in config.toml.
        let registry = Arc::new(WorkflowRegistry::new());
        register_builtin_workflows(&registry);
        for entry in &config.remote_workflows {
            if let Some(endpoint) = endpoint_ref(entry) {
                registry.register_remote(&entry.id, endpoint);
            }
        }

        // Wire the remote executor over the n8n webhook client
        let mut n8n = N8nClient::new(config.remote_timeout_secs);
        if let Some(base_url) = &config.n8n_base_url {
            n8n = n8n.with_base_url(base_url.clone());
        }
        let remote = RemoteExecutor::new(n8n, WebhookUrlCache::new());

        tracing::info!(
            data_dir = %data_dir.display(),
            workflows = registry.len(),
            "initialized application state"
        );

        let router = WorkflowRouter::new(
            registry,
            SqliteTraceRepository::new(db_pool.clone()),
            SqliteExecutionRepository::new(db_pool.clone()),
            remote,
        );

        let manifest_dir = resolve_manifest_dir(&config, &data_dir);
        let audit = AuditService::new(FsManifestStore::new(manifest_dir));

        Ok(Self {
            router: Arc::new(router),
            audit: Arc::new(audit),
            trace_repo: Arc::new(SqliteTraceRepository::new(db_pool.clone())),
            execution_repo: Arc::new(SqliteExecutionRepository::new(db_pool.clone())),
            config,
            data_dir,
            db_pool,
        })
    }
}

/// Register the local workflows that ship with the binary.
///
/// `echo-local` reflects its input back and exists so dispatch, tracing,
/// and execution bookkeeping can be exercised without a remote engine.
fn register_builtin_workflows(registry: &WorkflowRegistry) {
    registry.register_local(
        "echo-local",
        Arc::new(FnHandler::new(|input: WorkflowInput| async move {
            let mut data = Map::new();
            data.insert("action".to_string(), Value::String(input.action.clone()));
            data.insert("payload".to_string(), Value::Object(input.payload.clone()));
            Ok(WorkflowOutput::ok(
                data,
                OutputMetadata::stamp("echo-local"),
            ))
        })),
    );
}
