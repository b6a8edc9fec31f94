//! Graph data model
//!
//! Documents exchanged between the research producer, the filter command
//! and the graph server.

mod node;
mod edge;

pub use node::Node;
pub use edge::EdgeCandidate;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Shape of `graph.json`: trusted nodes plus the curated links between them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct GraphDocument {
    #[serde(default)]
    #[validate(nested)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub links: Vec<EdgeCandidate>,
}

impl GraphDocument {
    pub fn new(nodes: Vec<Node>, links: Vec<EdgeCandidate>) -> Self {
        Self { nodes, links }
    }
}

/// Shape of `sources.json` / `sources2.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinksDocument {
    #[serde(default)]
    pub links: Vec<EdgeCandidate>,
}

impl From<Vec<EdgeCandidate>> for LinksDocument {
    fn from(links: Vec<EdgeCandidate>) -> Self {
        Self { links }
    }
}
