//! In-process workflow handler execution.
//!
//! A [`LocalHandler`] is a trusted in-process function conforming to the
//! input/output envelope contract. [`LocalExecutor::run`] adds only timing:
//! it measures `duration_ms` and stamps `metadata.executed_at`. Handler
//! errors propagate unchanged to the router's catch path -- they are not a
//! distinct error kind here.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use chrono::Utc;

use flowtrace_types::envelope::{WorkflowInput, WorkflowOutput};

/// Boxed future alias for the object-safe handler trait.
pub type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<WorkflowOutput>> + Send + 'a>>;

/// An in-process workflow handler.
///
/// Object-safe so handlers can be stored behind `Arc<dyn LocalHandler>` in
/// the registry; implementations box their futures.
pub trait LocalHandler: Send + Sync {
    /// Run the handler against one input envelope.
    fn run(&self, input: WorkflowInput) -> HandlerFuture<'_>;
}

/// Adapter turning an async closure into a [`LocalHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(WorkflowInput) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<WorkflowOutput>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> LocalHandler for FnHandler<F>
where
    F: Fn(WorkflowInput) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<WorkflowOutput>> + Send + 'static,
{
    fn run(&self, input: WorkflowInput) -> HandlerFuture<'_> {
        Box::pin((self.f)(input))
    }
}

/// Runs local handlers with timing instrumentation.
pub struct LocalExecutor;

impl LocalExecutor {
    /// Invoke `handler` with `input`, stamping execution metadata on the
    /// returned envelope. Errors from the handler propagate to the caller.
    pub async fn run(
        handler: &dyn LocalHandler,
        workflow_id: &str,
        input: WorkflowInput,
    ) -> anyhow::Result<WorkflowOutput> {
        let started = Instant::now();
        let mut output = handler.run(input).await?;

        output.metadata.workflow_id = workflow_id.to_string();
        output.metadata.executed_at = Utc::now();
        output.metadata.duration_ms = started.elapsed().as_millis() as u64;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtrace_types::envelope::{InputContext, OutputMetadata, SourceService};
    use serde_json::{json, Map};

    fn sample_input(action: &str) -> WorkflowInput {
        WorkflowInput {
            action: action.to_string(),
            payload: Map::new(),
            context: InputContext {
                user_id: "u1".to_string(),
                trace_id: "t1".to_string(),
                requested_at: Utc::now(),
                source_service: SourceService::ReplitShell,
                attempt: 1,
            },
        }
    }

    #[tokio::test]
    async fn run_stamps_metadata() {
        let handler = FnHandler::new(|input: WorkflowInput| async move {
            let mut data = Map::new();
            data.insert("echo".to_string(), json!(input.action));
            Ok(WorkflowOutput::ok(data, OutputMetadata::stamp("placeholder")))
        });

        let output = LocalExecutor::run(&handler, "echo-local", sample_input("ping"))
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.metadata.workflow_id, "echo-local");
        assert_eq!(output.data.unwrap()["echo"], json!("ping"));
    }

    #[tokio::test]
    async fn handler_error_propagates() {
        let handler =
            FnHandler::new(|_input: WorkflowInput| async move { anyhow::bail!("handler blew up") });

        let result = LocalExecutor::run(&handler, "broken", sample_input("go")).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("handler blew up"));
    }
}
