//! CLI workflow dispatch and catalog listing.

use anyhow::{bail, Result};
use chrono::Utc;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use serde_json::{Map, Value};
use uuid::Uuid;

use flowtrace_types::envelope::{InputContext, SourceService, WorkflowInput};

use crate::state::AppState;

/// Dispatch one workflow invocation from the command line.
#[allow(clippy::too_many_arguments)]
pub async fn dispatch_workflow(
    state: &AppState,
    workflow_id: &str,
    action: &str,
    payload: Option<&str>,
    trace_id: Option<&str>,
    attempt: u32,
    user: &str,
    json: bool,
) -> Result<()> {
    let payload = parse_payload(payload)?;
    let trace_id = trace_id
        .map(String::from)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let input = WorkflowInput {
        action: action.to_string(),
        payload,
        context: InputContext {
            user_id: user.to_string(),
            trace_id: trace_id.clone(),
            requested_at: Utc::now(),
            source_service: SourceService::ReplitShell,
            attempt,
        },
    };

    let output = state.router.dispatch(workflow_id, input).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    if output.success {
        println!(
            "  {} Workflow '{}' succeeded in {}ms",
            style("✓").green(),
            style(workflow_id).cyan(),
            output.metadata.duration_ms
        );
    } else if let Some(err) = &output.error {
        println!(
            "  {} Workflow '{}' failed: [{}] {}",
            style("✗").red(),
            style(workflow_id).cyan(),
            style(serde_json::to_string(&err.code)?.trim_matches('"')).red(),
            err.message
        );
        if err.retryable {
            println!(
                "  {}",
                style(format!(
                    "Retryable. Re-dispatch with --trace-id {trace_id} --attempt {}",
                    attempt + 1
                ))
                .dim()
            );
        }
    }
    println!("  {} {}", style("trace id:").dim(), trace_id);
    if let Some(execution_id) = &output.metadata.execution_id {
        println!("  {} {}", style("execution:").dim(), execution_id);
    }
    if let Some(data) = &output.data {
        println!();
        println!("{}", serde_json::to_string_pretty(&Value::Object(data.clone()))?);
    }
    println!();

    Ok(())
}

/// List the registered workflow catalog.
pub async fn list_workflows(state: &AppState, json: bool) -> Result<()> {
    let registry = state.router.registry();
    let mut ids = registry.ids();
    ids.sort();

    if json {
        let workflows: Vec<Value> = ids
            .iter()
            .filter_map(|id| {
                registry
                    .get(id)
                    .map(|kind| serde_json::json!({ "id": id, "mode": kind.destination() }))
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&workflows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Workflow", "Mode"]);

    for id in &ids {
        if let Some(kind) = registry.get(id) {
            let mode_cell = match kind.destination() {
                "local" => Cell::new("local").fg(Color::Green),
                other => Cell::new(other).fg(Color::Blue),
            };
            table.add_row(vec![Cell::new(id), mode_cell]);
        }
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

/// Parse the --payload argument into a JSON object.
fn parse_payload(payload: Option<&str>) -> Result<Map<String, Value>> {
    let Some(raw) = payload else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => bail!("--payload must be a JSON object"),
        Err(e) => bail!("--payload is not valid JSON: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_defaults_to_empty_object() {
        assert!(parse_payload(None).unwrap().is_empty());
    }

    #[test]
    fn payload_accepts_json_object() {
        let map = parse_payload(Some(r#"{"depth": 3}"#)).unwrap();
        assert_eq!(map["depth"], serde_json::json!(3));
    }

    #[test]
    fn payload_rejects_non_object() {
        assert!(parse_payload(Some("[1, 2]")).is_err());
        assert!(parse_payload(Some("not json")).is_err());
    }
}
