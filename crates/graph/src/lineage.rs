//! Lineage graph over accepted edges
//!
//! In-memory adjacency for walking "influenced" / "influenced by" chains.

use lineage_common::models::{EdgeCandidate, Node};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Direction for graph traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges forward: models this one influenced
    #[default]
    Descendants,
    /// Follow edges backward: models that influenced this one
    Ancestors,
    /// Both directions
    Both,
}

/// A node reached by a traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageHop {
    pub id: String,
    pub hop: usize,
}

/// Adjacency view of a set of lineage edges
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    /// id -> models it influenced
    outgoing: HashMap<String, Vec<String>>,

    /// id -> models that influenced it
    incoming: HashMap<String, Vec<String>>,

    edge_count: usize,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from accepted edges
    pub fn from_edges(edges: &[EdgeCandidate]) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(&edge.source, &edge.target);
        }
        graph
    }

    pub fn add_edge(&mut self, source: &str, target: &str) {
        self.outgoing.entry(source.to_string()).or_default().push(target.to_string());
        self.incoming.entry(target.to_string()).or_default().push(source.to_string());
        self.edge_count += 1;
    }

    /// Models `id` influenced
    pub fn influences(&self, id: &str) -> &[String] {
        self.outgoing.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Models that influenced `id`
    pub fn influenced_by(&self, id: &str) -> &[String] {
        self.incoming.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.outgoing.contains_key(id) || self.incoming.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.outgoing
            .keys()
            .chain(self.incoming.keys())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Breadth-first walk from `start` up to `depth` hops.
    ///
    /// Each node is reported once, at its shortest hop distance, in
    /// discovery order. `start` itself is not reported.
    pub fn traverse(&self, start: &str, depth: usize, direction: Direction) -> Vec<LineageHop> {
        let mut visited: HashSet<&str> = HashSet::from([start]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(start, 0)]);
        let mut result = Vec::new();

        while let Some((current, hop)) = queue.pop_front() {
            if hop == depth {
                continue;
            }

            let forward: &[String] = match direction {
                Direction::Descendants | Direction::Both => self.influences(current),
                Direction::Ancestors => &[],
            };
            let backward: &[String] = match direction {
                Direction::Ancestors | Direction::Both => self.influenced_by(current),
                Direction::Descendants => &[],
            };

            for next in forward.iter().chain(backward) {
                if visited.insert(next.as_str()) {
                    result.push(LineageHop {
                        id: next.clone(),
                        hop: hop + 1,
                    });
                    queue.push_back((next.as_str(), hop + 1));
                }
            }
        }

        result
    }
}

/// Nodes sorted by publication date, oldest first.
///
/// Undated nodes go last; ties keep their input order. Since accepted edges
/// never point backward in time, this is a topological order for every edge
/// between distinct dates.
pub fn chronological_order(nodes: &[Node]) -> Vec<&Node> {
    let mut sorted: Vec<&Node> = nodes.iter().collect();
    sorted.sort_by_key(|node| {
        let date = node.parsed_date();
        (date.is_none(), date)
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> LineageGraph {
        // transformer -> bert -> roberta, transformer -> gpt -> gpt-2
        LineageGraph::from_edges(&[
            EdgeCandidate::new("transformer", "bert"),
            EdgeCandidate::new("bert", "roberta"),
            EdgeCandidate::new("transformer", "gpt"),
            EdgeCandidate::new("gpt", "gpt-2"),
        ])
    }

    fn ids(hops: &[LineageHop]) -> Vec<(&str, usize)> {
        hops.iter().map(|h| (h.id.as_str(), h.hop)).collect()
    }

    #[test]
    fn test_graph_construction() {
        let graph = graph();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.influences("transformer"), &["bert".to_string(), "gpt".to_string()]);
        assert_eq!(graph.influenced_by("roberta"), &["bert".to_string()]);
        assert!(graph.influences("roberta").is_empty());
        assert!(!graph.contains("t5"));
    }

    #[test]
    fn test_traverse_descendants() {
        let graph = graph();
        let hops = graph.traverse("transformer", 2, Direction::Descendants);
        assert_eq!(
            ids(&hops),
            vec![("bert", 1), ("gpt", 1), ("roberta", 2), ("gpt-2", 2)]
        );

        let hops = graph.traverse("transformer", 1, Direction::Descendants);
        assert_eq!(ids(&hops), vec![("bert", 1), ("gpt", 1)]);
    }

    #[test]
    fn test_traverse_ancestors_and_both() {
        let graph = graph();
        let hops = graph.traverse("roberta", 5, Direction::Ancestors);
        assert_eq!(ids(&hops), vec![("bert", 1), ("transformer", 2)]);

        let hops = graph.traverse("bert", 2, Direction::Both);
        assert_eq!(
            ids(&hops),
            vec![("roberta", 1), ("transformer", 1), ("gpt", 2)]
        );
    }

    #[test]
    fn test_traverse_zero_depth_and_unknown_start() {
        let graph = graph();
        assert!(graph.traverse("transformer", 0, Direction::Both).is_empty());
        assert!(graph.traverse("t5", 3, Direction::Both).is_empty());
    }

    #[test]
    fn test_chronological_order() {
        let nodes = vec![
            Node::new("gpt-3", "2020-05-28"),
            Node::undated("mystery"),
            Node::new("bert", "2018-10-11"),
            Node::new("gpt", "2018-06-11"),
            Node::new("bert-twin", "2018-10-11"),
        ];
        let order: Vec<&str> = chronological_order(&nodes).into_iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["gpt", "bert", "bert-twin", "gpt-3", "mystery"]);
    }
}
