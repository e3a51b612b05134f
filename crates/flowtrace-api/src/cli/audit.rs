//! CLI trace auditing.

use anyhow::{bail, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use uuid::Uuid;

use flowtrace_core::audit::ValidateOptions;
use flowtrace_core::repository::TraceRepository;
use flowtrace_types::manifest::StepStatus;

use crate::state::AppState;

/// Audit an execution's traces against a step manifest.
pub async fn validate(
    state: &AppState,
    manifest_id: &str,
    execution_id: &str,
    up_to_step: Option<String>,
    json: bool,
) -> Result<()> {
    let execution_id = Uuid::parse_str(execution_id)
        .map_err(|_| anyhow::anyhow!("'{execution_id}' is not a valid execution id"))?;

    let traces = state.trace_repo.list_for_execution(&execution_id).await?;

    let options = ValidateOptions { up_to_step };
    let Some(report) = state
        .audit
        .validate_traces(manifest_id, &traces, &options)
        .await
    else {
        bail!("manifest '{manifest_id}' could not be loaded");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Step", "Name", "Status", "Checks"]);

    for step in &report.steps {
        let status_cell = match step.status {
            StepStatus::Pass => Cell::new("pass").fg(Color::Green),
            StepStatus::Fail => Cell::new("fail").fg(Color::Red),
            StepStatus::Missing => Cell::new("missing").fg(Color::Yellow),
        };
        let checks = step
            .checks
            .iter()
            .map(|c| {
                let mark = if c.passed { "✓" } else { "✗" };
                match &c.detail {
                    Some(detail) => format!("{mark} {} ({detail})", c.name),
                    None => format!("{mark} {}", c.name),
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        table.add_row(vec![
            Cell::new(&step.step_id),
            Cell::new(&step.step_name),
            status_cell,
            Cell::new(checks),
        ]);
    }

    println!();
    println!(
        "  Manifest {} v{}",
        style(&report.manifest_id).cyan(),
        report.manifest_version
    );
    println!("{table}");
    println!(
        "  {} checked: {} passed, {} failed, {} missing",
        report.steps_checked,
        style(report.passed).green(),
        style(report.failed).red(),
        style(report.missing).yellow()
    );
    println!();

    if report.failed > 0 || report.missing > 0 {
        std::process::exit(1);
    }

    Ok(())
}
