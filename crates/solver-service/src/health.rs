//! Minimal observability surface: `/health` reports process lifecycle
//! state, `/cursors` reports the last-processed block per configured
//! chain. No metrics endpoint and no order/quote API — submitting intents
//! over HTTP is out of scope for this process.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use solver_core::{LifecycleState, SolverManager};
use tower_http::trace::TraceLayer;

#[derive(Serialize)]
struct HealthResponse {
	status: &'static str,
}

async fn health(axum::extract::State(manager): axum::extract::State<Arc<SolverManager>>) -> Json<HealthResponse> {
	let status = match manager.lifecycle_state().await {
		LifecycleState::Running => "healthy",
		LifecycleState::Stopping | LifecycleState::Stopped => "stopping",
		LifecycleState::Failed => "unhealthy",
		LifecycleState::Uninitialized | LifecycleState::Initializing => "starting",
	};
	Json(HealthResponse { status })
}

async fn cursors(
	axum::extract::State(manager): axum::extract::State<Arc<SolverManager>>,
) -> Json<std::collections::HashMap<String, u64>> {
	Json(manager.cursor().snapshot().await.0)
}

/// Builds the router `main.rs` serves on `HEALTH_PORT`.
pub fn router(manager: Arc<SolverManager>) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/cursors", get(cursors))
		.layer(TraceLayer::new_for_http())
		.with_state(manager)
}
