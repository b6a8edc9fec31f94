//! Validated graph held by the server
//!
//! The graph is loaded once at startup, checked, and shared read-only.

use lineage_common::errors::{AppError, Result};
use lineage_common::metrics;
use lineage_common::models::{EdgeCandidate, GraphDocument, Node};
use lineage_graph::{chronological_order, filter_edges, io, LineageGraph, NodeIndex};
use std::path::Path;
use tracing::{info, warn};
use validator::Validate;

pub struct ServedGraph {
    /// Nodes by date, oldest first, undated last
    nodes: Vec<Node>,

    /// Links that passed the edge filter, in file order
    links: Vec<EdgeCandidate>,

    lineage: LineageGraph,
    index: NodeIndex,
}

impl ServedGraph {
    pub fn load(path: &Path) -> Result<Self> {
        let document = io::load_graph(path)?;
        Self::from_document(document)
    }

    /// Validate a graph document.
    ///
    /// Every node needs an id and a date. Links referencing unknown or
    /// undated nodes are fatal; backward-in-time and repeated links are
    /// dropped with a warning.
    pub fn from_document(document: GraphDocument) -> Result<Self> {
        document.validate()?;

        if let Some(node) = document
            .nodes
            .iter()
            .find(|node| node.date.as_deref().map_or(true, str::is_empty))
        {
            return Err(AppError::Validation {
                message: format!("Node {} missing date", node.id),
                field: Some("date".to_string()),
            });
        }

        let index = NodeIndex::build(&document.nodes);
        let outcome = filter_edges(&index, &document.links);
        metrics::record_filter_pass(
            outcome.stats.accepted,
            outcome.stats.rejected,
            outcome.missing_ids.len(),
        );

        if !outcome.is_clean() {
            return Err(AppError::MissingReferences {
                ids: outcome.missing_ids.into_iter().collect(),
            });
        }

        let rejected = outcome.stats.rejected;
        if outcome.stats.rejected_total() > 0 {
            warn!(
                temporal_violation = rejected.temporal_violation,
                duplicate = rejected.duplicate,
                "Dropped links from graph document"
            );
        }

        let nodes: Vec<Node> = chronological_order(&document.nodes).into_iter().cloned().collect();
        let lineage = LineageGraph::from_edges(&outcome.accepted);

        info!(
            nodes = nodes.len(),
            links = outcome.accepted.len(),
            "Graph data loaded"
        );

        Ok(Self {
            nodes,
            links: outcome.accepted,
            lineage,
            index,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[EdgeCandidate] {
        &self.links
    }

    pub fn lineage(&self) -> &LineageGraph {
        &self.lineage
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }
}
