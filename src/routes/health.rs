use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

/// `GET /health` — liveness probe, no dependencies touched.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /api/v1/health` — includes database connectivity.
async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let (status, database) = match state.db.ping().await {
        Ok(()) => ("ok", "connected"),
        Err(e) => {
            tracing::warn!("Database ping failed: {e}");
            ("degraded", "disconnected")
        }
    };

    Json(DetailedHealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}

pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(health_detailed))
}
