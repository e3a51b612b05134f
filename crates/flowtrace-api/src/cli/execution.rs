//! CLI execution listing.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};

use flowtrace_core::repository::ExecutionRepository;
use flowtrace_types::execution::ExecutionStatus;

use crate::state::AppState;

/// Show recent executions of a workflow, newest first.
pub async fn list_executions(
    state: &AppState,
    workflow_id: &str,
    limit: u32,
    json: bool,
) -> Result<()> {
    let executions = state
        .execution_repo
        .list_for_workflow(workflow_id, limit)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&executions)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!();
        println!(
            "  No executions recorded for '{}'.",
            console::style(workflow_id).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Execution", "Status", "Started", "Completed", "Trigger trace"]);

    for execution in &executions {
        let status_cell = match execution.status {
            ExecutionStatus::Completed => Cell::new("completed").fg(Color::Green),
            ExecutionStatus::Failed => Cell::new("failed").fg(Color::Red),
            ExecutionStatus::Running => Cell::new("running").fg(Color::Yellow),
            ExecutionStatus::Pending => Cell::new("pending").fg(Color::DarkGrey),
        };
        let completed = execution
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(execution.id),
            status_cell,
            Cell::new(execution.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(completed),
            Cell::new(&execution.trigger_trace_id),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}
