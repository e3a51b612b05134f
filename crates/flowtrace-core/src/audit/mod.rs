//! Declarative step auditing.
//!
//! Validates the communication traces collected for one execution against
//! an externally authored [`WorkflowManifest`]. The manifest comes from a
//! [`ManifestStore`]; the actual rule evaluation lives in [`validator`] and
//! is pure.

pub mod validator;

use flowtrace_types::error::ManifestError;
use flowtrace_types::manifest::{ValidationReport, WorkflowManifest};
use flowtrace_types::trace::CommunicationTrace;

pub use validator::{validate, ValidateOptions};

/// Port for loading audit manifests by id.
///
/// Implemented in `flowtrace-infra` against a manifest directory.
pub trait ManifestStore: Send + Sync {
    /// Load a manifest, `Ok(None)` when no manifest exists for the id.
    fn load(
        &self,
        manifest_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowManifest>, ManifestError>> + Send;
}

/// Loads manifests and runs the step validator over trace sets.
pub struct AuditService<M: ManifestStore> {
    store: M,
}

impl<M: ManifestStore> AuditService<M> {
    pub fn new(store: M) -> Self {
        Self { store }
    }

    /// Validate `traces` against the manifest identified by `manifest_id`.
    ///
    /// Returns `None` when the manifest does not exist or cannot be loaded;
    /// a missing contract yields no report rather than a failing one.
    pub async fn validate_traces(
        &self,
        manifest_id: &str,
        traces: &[CommunicationTrace],
        options: &ValidateOptions,
    ) -> Option<ValidationReport> {
        let manifest = match self.store.load(manifest_id).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                tracing::warn!(manifest_id, "no audit manifest found");
                return None;
            }
            Err(err) => {
                tracing::error!(manifest_id, error = %err, "failed to load audit manifest");
                return None;
            }
        };

        let report = validator::validate(manifest_id, &manifest, traces, options);
        tracing::info!(
            manifest_id,
            steps_checked = report.steps_checked,
            passed = report.passed,
            failed = report.failed,
            missing = report.missing,
            "validated execution traces"
        );
        Some(report)
    }
}
