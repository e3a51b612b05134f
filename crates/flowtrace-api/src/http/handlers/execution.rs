//! Execution inspection handlers for the REST API.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use flowtrace_core::repository::{ExecutionRepository, TraceRepository};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for listing executions.
#[derive(Debug, Deserialize)]
pub struct ListExecutionsQuery {
    /// Maximum number of executions to return (default 20).
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

/// GET /api/v1/executions/:id - Execution with its ordered trace rows.
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let execution_id = Uuid::parse_str(&id)
        .map_err(|_| AppError::Validation(format!("'{id}' is not a valid execution id")))?;

    let execution = state
        .execution_repo
        .get_execution(&execution_id)
        .await?
        .ok_or_else(|| AppError::ExecutionNotFound(id.clone()))?;

    let traces = state.trace_repo.list_for_execution(&execution_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let data = json!({
        "execution": execution,
        "traces": traces,
    });
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/executions/{id}"));

    Ok(Json(resp))
}

/// GET /api/v1/workflows/:id/executions - Recent executions, newest first.
pub async fn list_executions(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let executions = state
        .execution_repo
        .list_for_workflow(&workflow_id, query.limit)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let executions_json: Vec<serde_json::Value> = executions
        .iter()
        .filter_map(|e| serde_json::to_value(e).ok())
        .collect();

    let resp = ApiResponse::success(executions_json, request_id, elapsed).with_link(
        "self",
        &format!("/api/v1/workflows/{workflow_id}/executions"),
    );

    Ok(Json(resp))
}
