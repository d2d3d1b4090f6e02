use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use dailybrief_scheduler::Scheduler;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub scheduler: Scheduler,
}

/// Assemble the Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// GET /ping — keep-alive target for the heartbeat pinger. Any response
/// counts, so the body is deliberately trivial.
async fn ping_handler() -> &'static str {
    "pong"
}

/// GET /healthz — liveness probe plus a snapshot of the armed timer table.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let jobs: Vec<Value> = state
        .scheduler
        .registry()
        .snapshot()
        .into_iter()
        .map(|(user_id, scheduled_for)| {
            json!({ "user_id": user_id, "next_fire": scheduled_for.to_rfc3339() })
        })
        .collect();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "armed_jobs": jobs.len(),
        "jobs": jobs,
    }))
}
