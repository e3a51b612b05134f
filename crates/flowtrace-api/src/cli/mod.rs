//! CLI command definitions and dispatch for the `flowtrace` binary.
//!
//! Uses clap derive macros for argument parsing. Commands map one-to-one
//! onto the router, execution store, and audit service operations.

pub mod audit;
pub mod dispatch;
pub mod execution;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Dispatch workflows and audit their communication traces.
#[derive(Parser)]
#[command(name = "flowtrace", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans via OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch a workflow through the router.
    Dispatch {
        /// Workflow id to dispatch.
        workflow_id: String,

        /// Action the workflow should perform.
        #[arg(long)]
        action: String,

        /// JSON object payload for the workflow.
        #[arg(long)]
        payload: Option<String>,

        /// Correlation id (generated when omitted; reuse it to retry).
        #[arg(long)]
        trace_id: Option<String>,

        /// Attempt number for retries of the same trace id.
        #[arg(long, default_value = "1")]
        attempt: u32,

        /// User on whose behalf the call is made.
        #[arg(long, default_value = "cli")]
        user: String,
    },

    /// List registered workflows.
    Workflows,

    /// Show recent executions of a workflow.
    Executions {
        /// Workflow id.
        workflow_id: String,

        /// Maximum number of executions to display.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Audit an execution's traces against a step manifest.
    Validate {
        /// Manifest id (file stem in the manifest directory).
        manifest_id: String,

        /// Execution UUID whose traces are audited.
        execution_id: String,

        /// Stop checking after this step id (inclusive).
        #[arg(long)]
        up_to_step: Option<String>,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
