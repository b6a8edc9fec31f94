//! Model lineage graph
//!
//! Turns a noisy list of candidate "A influenced B" edges into a valid,
//! deduplicated, temporally consistent edge set:
//! - Identifier and date indexes over the trusted node set
//! - The candidate edge filter and its missing-identifier report
//! - Adjacency view and traversal over accepted edges
//! - Reading and writing the graph documents

pub mod filter;
pub mod index;
pub mod io;
pub mod lineage;

pub use filter::{filter, filter_edges, EdgeFilter, FilterOutcome, FilterStats, Rejection, Verdict};
pub use index::{DateIndex, IdentifierIndex, NodeIndex, NodeStatus};
pub use lineage::{chronological_order, Direction, LineageGraph, LineageHop};
