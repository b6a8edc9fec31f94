//! Graph handlers

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use lineage_common::{
    errors::{AppError, Result},
    models::{EdgeCandidate, Node},
};
use lineage_graph::{Direction, LineageHop};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::AppState;

#[derive(Serialize)]
struct GraphView<'a> {
    nodes: &'a [Node],
    links: &'a [EdgeCandidate],
}

/// Full graph: nodes oldest first, validated links
pub async fn get_graph(State(state): State<AppState>) -> Response {
    let graph = &state.graph;
    Json(GraphView {
        nodes: graph.nodes(),
        links: graph.links(),
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LineageQuery {
    #[serde(default)]
    pub direction: Direction,
    pub depth: Option<usize>,
}

#[derive(Serialize)]
pub struct LineageResponse {
    pub id: String,
    pub direction: Direction,
    pub depth: usize,
    pub nodes: Vec<LineageHop>,

    /// Links between the start node and the nodes reached
    pub links: Vec<EdgeCandidate>,
}

/// Models reachable from one node
pub async fn get_lineage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LineageQuery>,
) -> Result<Json<LineageResponse>> {
    let graph = &state.graph;
    if !graph.contains(&id) {
        return Err(AppError::NodeNotFound { id });
    }

    let max_depth = state.config.server.max_traversal_depth;
    let depth = query.depth.unwrap_or(max_depth).min(max_depth);

    let hops = graph.lineage().traverse(&id, depth, query.direction);

    let reached: HashSet<&str> = hops
        .iter()
        .map(|hop| hop.id.as_str())
        .chain(std::iter::once(id.as_str()))
        .collect();
    let links = graph
        .links()
        .iter()
        .filter(|link| reached.contains(link.source.as_str()) && reached.contains(link.target.as_str()))
        .cloned()
        .collect();

    tracing::debug!(id = %id, depth, reached = hops.len(), "Lineage traversal");

    Ok(Json(LineageResponse {
        id,
        direction: query.direction,
        depth,
        nodes: hops,
        links,
    }))
}
