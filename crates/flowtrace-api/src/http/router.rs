//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Workflow dispatch
        .route("/workflows", get(handlers::workflow::list_workflows))
        .route(
            "/workflows/{id}/trigger",
            post(handlers::workflow::trigger_workflow),
        )
        .route(
            "/workflows/{id}/executions",
            get(handlers::execution::list_executions),
        )
        // Execution inspection
        .route(
            "/executions/{id}",
            get(handlers::execution::get_execution),
        )
        // Trace auditing
        .route("/audit/validate", post(handlers::audit::validate));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
