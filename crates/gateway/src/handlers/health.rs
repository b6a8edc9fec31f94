//! Health check handlers

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub graph: GraphCheck,
}

#[derive(Serialize)]
pub struct GraphCheck {
    pub status: String,
    pub nodes: usize,
    pub links: usize,
}

/// Liveness check, healthy whenever the server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness check, reports the loaded graph
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let graph = &state.graph;

    Json(ReadyResponse {
        status: "ready".to_string(),
        checks: HealthChecks {
            graph: GraphCheck {
                status: "up".to_string(),
                nodes: graph.nodes().len(),
                links: graph.links().len(),
            },
        },
    })
}

/// Prometheus exposition, when a recorder is installed
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
