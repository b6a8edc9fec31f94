//! Identifier and date indexes over the trusted node set
//!
//! Both indexes are built once from the node collection and are read-only
//! afterwards. A node whose date is absent or malformed is still known
//! through the identifier index; it is simply missing from the date index.

use chrono::NaiveDate;
use lineage_common::models::Node;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Set of trusted node ids
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    ids: HashSet<String>,
}

impl IdentifierIndex {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Publication date of every node whose date parses as `YYYY-MM-DD`
#[derive(Debug, Clone, Default)]
pub struct DateIndex {
    dates: HashMap<String, NaiveDate>,
}

impl DateIndex {
    pub fn get(&self, id: &str) -> Option<NaiveDate> {
        self.dates.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// How an id relates to the trusted node set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Not in the identifier index
    Unknown,
    /// Known, but without a usable date
    Undated,
    /// Known and dated
    Dated(NaiveDate),
}

/// Identifier index plus date index, built together in one pass
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    identifiers: IdentifierIndex,
    dates: DateIndex,
}

impl NodeIndex {
    /// Index a node collection.
    ///
    /// Nodes with an empty id are ignored. When an id occurs more than once
    /// the last parsable date wins.
    pub fn build(nodes: &[Node]) -> Self {
        let mut index = Self::default();

        for node in nodes {
            if node.id.is_empty() {
                continue;
            }

            index.identifiers.ids.insert(node.id.clone());

            if let Some(date) = node.parsed_date() {
                index.dates.dates.insert(node.id.clone(), date);
            }
        }

        debug!(
            nodes = nodes.len(),
            known = index.identifiers.len(),
            dated = index.dates.len(),
            "Node index built"
        );

        index
    }

    pub fn identifiers(&self) -> &IdentifierIndex {
        &self.identifiers
    }

    pub fn dates(&self) -> &DateIndex {
        &self.dates
    }

    /// Classify an id against both indexes
    pub fn status(&self, id: &str) -> NodeStatus {
        if !self.identifiers.contains(id) {
            return NodeStatus::Unknown;
        }
        match self.dates.get(id) {
            Some(date) => NodeStatus::Dated(date),
            None => NodeStatus::Undated,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.identifiers.contains(id)
    }

    pub fn date_of(&self, id: &str) -> Option<NaiveDate> {
        self.dates.get(id)
    }

    /// Known ids without a usable date, sorted
    pub fn undated_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .identifiers
            .iter()
            .filter(|id| !self.dates.contains(id))
            .collect();
        ids.sort_unstable();
        ids
    }
}
