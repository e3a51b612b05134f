//! Flowtrace CLI and REST API entry point.
//!
//! Binary name: `flowtrace`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,flowtrace=debug",
        _ => "trace",
    };

    if cli.otel {
        // The OTel pipeline reads RUST_LOG; the verbosity flags apply to
        // the plain subscriber only.
        flowtrace_observe::tracing_setup::init_tracing(true)
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_target(false)
            .init();
    }

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "flowtrace", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize application state (DB, services)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Dispatch {
            workflow_id,
            action,
            payload,
            trace_id,
            attempt,
            user,
        } => {
            cli::dispatch::dispatch_workflow(
                &state,
                &workflow_id,
                &action,
                payload.as_deref(),
                trace_id.as_deref(),
                attempt,
                &user,
                cli.json,
            )
            .await?;
        }

        Commands::Workflows => {
            cli::dispatch::list_workflows(&state, cli.json).await?;
        }

        Commands::Executions { workflow_id, limit } => {
            cli::execution::list_executions(&state, &workflow_id, limit, cli.json).await?;
        }

        Commands::Validate {
            manifest_id,
            execution_id,
            up_to_step,
        } => {
            cli::audit::validate(&state, &manifest_id, &execution_id, up_to_step, cli.json)
                .await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Flowtrace API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    if cli.otel {
        flowtrace_observe::tracing_setup::shutdown_tracing();
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
