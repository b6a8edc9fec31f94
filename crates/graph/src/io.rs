//! Reading and writing graph documents
//!
//! - `graph.json`: `{"nodes": [...], "links": [...]}`
//! - `sources.json` / `sources2.json`: `{"links": [...]}`
//! - `missing_ids.txt`: one id per line, sorted

use lineage_common::errors::{AppError, Result};
use lineage_common::models::{EdgeCandidate, GraphDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Candidates read from a links document
#[derive(Debug, Clone, Default)]
pub struct CandidateLoad {
    pub candidates: Vec<EdgeCandidate>,

    /// Entries skipped because `source` or `target` was not a string
    pub malformed: usize,
}

#[derive(Deserialize)]
struct RawLinks {
    #[serde(default)]
    links: Vec<Value>,
}

#[derive(Serialize)]
struct LinksRef<'a> {
    links: &'a [EdgeCandidate],
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| AppError::io(path, e))
}

fn parse<T: for<'de> Deserialize<'de>>(path: &Path, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| AppError::InvalidFormat {
        message: format!("{}: {}", path.display(), e),
    })
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Load the trusted graph document
pub fn load_graph(path: &Path) -> Result<GraphDocument> {
    let graph: GraphDocument = parse(path, &read(path)?)?;
    debug!(
        path = %path.display(),
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        "Graph document loaded"
    );
    Ok(graph)
}

/// Load candidate edges, skipping entries without string endpoints
pub fn load_candidates(path: &Path) -> Result<CandidateLoad> {
    let raw: RawLinks = parse(path, &read(path)?)?;

    let mut load = CandidateLoad::default();
    for (position, value) in raw.links.into_iter().enumerate() {
        match EdgeCandidate::try_from(value) {
            Ok(candidate) => load.candidates.push(candidate),
            Err(e) => {
                warn!(path = %path.display(), position, error = %e, "Skipping malformed link");
                load.malformed += 1;
            }
        }
    }

    debug!(
        path = %path.display(),
        candidates = load.candidates.len(),
        malformed = load.malformed,
        "Candidate links loaded"
    );
    Ok(load)
}

/// Write `{"links": [...]}` with 4-space indentation
pub fn write_links(path: &Path, links: &[EdgeCandidate]) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    LinksRef { links }.serialize(&mut serializer)?;

    ensure_parent(path)?;
    fs::write(path, buf).map_err(|e| AppError::io(path, e))
}

/// Write the missing-identifier report, one id per line
pub fn write_missing_ids(path: &Path, ids: &BTreeSet<String>) -> Result<()> {
    let body: String = ids.iter().map(|id| format!("{}\n", id)).collect();

    ensure_parent(path)?;
    fs::write(path, body).map_err(|e| AppError::io(path, e))
}
