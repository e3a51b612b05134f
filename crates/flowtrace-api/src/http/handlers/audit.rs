//! Trace auditing handlers for the REST API.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use flowtrace_core::audit::ValidateOptions;
use flowtrace_core::repository::TraceRepository;
use flowtrace_types::manifest::ValidationReport;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of POST /audit/validate.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// Manifest to validate against.
    pub manifest_id: String,
    /// Execution whose traces are audited.
    pub execution_id: String,
    /// Stop checking after this step id (inclusive).
    #[serde(default)]
    pub up_to_step: Option<String>,
}

/// POST /api/v1/audit/validate - Audit an execution's traces against a manifest.
pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Result<Json<ApiResponse<ValidationReport>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let execution_id = Uuid::parse_str(&body.execution_id).map_err(|_| {
        AppError::Validation(format!(
            "'{}' is not a valid execution id",
            body.execution_id
        ))
    })?;

    let traces = state.trace_repo.list_for_execution(&execution_id).await?;

    let options = ValidateOptions {
        up_to_step: body.up_to_step,
    };
    let report = state
        .audit
        .validate_traces(&body.manifest_id, &traces, &options)
        .await
        .ok_or_else(|| {
            AppError::AuditFailed(format!(
                "manifest '{}' could not be loaded",
                body.manifest_id
            ))
        })?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(report, request_id, elapsed)
        .with_link("self", "/api/v1/audit/validate");

    Ok(Json(resp))
}
