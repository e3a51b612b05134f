//! Workflow dispatch handlers for the REST API.
//!
//! The trigger endpoint wraps the request body into the standard input
//! envelope and hands it to the workflow router; the router's output
//! envelope is returned as-is, whether the workflow succeeded or not.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use flowtrace_types::envelope::{InputContext, SourceService, WorkflowInput};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of POST /workflows/{id}/trigger.
///
/// Only `action` is required; the server fills the correlation context,
/// generating a fresh trace id when the caller did not supply one.
#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub action: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub attempt: Option<u32>,
    #[serde(default)]
    pub source_service: Option<SourceService>,
}

/// POST /api/v1/workflows/:id/trigger - Dispatch a workflow.
pub async fn trigger_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Json(body): Json<TriggerRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let trace_id = body
        .trace_id
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    let input = WorkflowInput {
        action: body.action,
        payload: body.payload,
        context: InputContext {
            user_id: body.user_id.unwrap_or_else(|| "anonymous".to_string()),
            trace_id: trace_id.clone(),
            requested_at: Utc::now(),
            source_service: body.source_service.unwrap_or(SourceService::Bilko),
            attempt: body.attempt.unwrap_or(1),
        },
    };

    let output = state.router.dispatch(&workflow_id, input).await;
    let execution_id = output.metadata.execution_id.clone();

    let elapsed = start.elapsed().as_millis() as u64;
    let data = json!({
        "output": output,
        "trace_id": trace_id,
        "execution_id": execution_id,
    });
    let mut resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/workflows/{workflow_id}/trigger"));
    if let Some(execution_id) = &execution_id {
        resp = resp.with_link("execution", &format!("/api/v1/executions/{execution_id}"));
    }

    Ok(Json(resp))
}

/// GET /api/v1/workflows - List registered workflows and their dispatch mode.
pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let registry = state.router.registry();
    let mut ids = registry.ids();
    ids.sort();

    let workflows: Vec<serde_json::Value> = ids
        .iter()
        .filter_map(|id| {
            registry
                .get(id)
                .map(|kind| json!({ "id": id, "mode": kind.destination() }))
        })
        .collect();

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(workflows, request_id, elapsed)
        .with_link("self", "/api/v1/workflows");

    Ok(Json(resp))
}
