//! Candidate edge filter
//!
//! Reduces a raw candidate edge list to a valid, deduplicated, temporally
//! consistent edge set, and reports every referenced id that is unknown or
//! undated. Each candidate passes through these gates in order:
//!
//! 1. `source` not in the identifier index: record `source` as missing
//! 2. `target` not in the identifier index: record `target` as missing
//! 3. `source` known but not in the date index: record `source` as missing
//! 4. `target` known but not in the date index: record `target` as missing
//! 5. `date[source] > date[target]`: temporal violation, rejected silently
//! 6. `(source, target)` already accepted: duplicate, rejected silently
//! 7. otherwise accepted
//!
//! Gates 1-4 are all evaluated before the candidate is rejected, so a single
//! candidate can report both of its endpoints. Edges only ever point forward
//! (or sideways) in time, which keeps the dated graph acyclic except for
//! same-date pairs.
//!
//! Nothing here is fatal: anomalies are aggregated, never raised.

use lineage_common::metrics::RejectionCounts;
use lineage_common::models::{EdgeCandidate, Node};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

use crate::index::{NodeIndex, NodeStatus};

/// Why a candidate was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// An endpoint is not a trusted node
    UnknownReference,
    /// An endpoint is trusted but has no usable date
    UndatedReference,
    /// The source postdates the target
    TemporalViolation,
    /// The same `(source, target)` pair was already accepted
    Duplicate,
}

impl Rejection {
    /// Whether this rejection adds ids to the missing-identifier report
    pub fn records_missing(&self) -> bool {
        matches!(self, Rejection::UnknownReference | Rejection::UndatedReference)
    }
}

/// Decision for a single candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

/// Counters for one filter pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub candidates: usize,
    pub accepted: usize,
    pub rejected: RejectionCounts,
}

impl FilterStats {
    pub fn rejected_total(&self) -> usize {
        let r = &self.rejected;
        r.unknown_reference + r.undated_reference + r.temporal_violation + r.duplicate
    }
}

/// Result of a filter pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Accepted candidates, in input order, first occurrence of each pair
    pub accepted: Vec<EdgeCandidate>,

    /// Unknown or undated ids, sorted
    pub missing_ids: BTreeSet<String>,

    pub stats: FilterStats,
}

impl FilterOutcome {
    /// True when no candidate referenced an unknown or undated id
    pub fn is_clean(&self) -> bool {
        self.missing_ids.is_empty()
    }
}

/// Incremental filter over one node index
///
/// Candidates are offered one at a time; state accumulated between offers is
/// the set of accepted pairs and the missing-identifier set.
pub struct EdgeFilter<'a> {
    index: &'a NodeIndex,
    seen: HashSet<(String, String)>,
    accepted: Vec<EdgeCandidate>,
    missing_ids: BTreeSet<String>,
    stats: FilterStats,
}

impl<'a> EdgeFilter<'a> {
    pub fn new(index: &'a NodeIndex) -> Self {
        Self {
            index,
            seen: HashSet::new(),
            accepted: Vec::new(),
            missing_ids: BTreeSet::new(),
            stats: FilterStats::default(),
        }
    }

    /// Run one candidate through every gate
    pub fn offer(&mut self, candidate: &EdgeCandidate) -> Verdict {
        self.stats.candidates += 1;

        let verdict = self.judge(candidate);

        match verdict {
            Verdict::Accepted => {
                self.stats.accepted += 1;
                self.accepted.push(candidate.clone());
            }
            Verdict::Rejected(reason) => {
                trace!(
                    source = %candidate.source,
                    target = %candidate.target,
                    reason = ?reason,
                    reported = reason.records_missing(),
                    "Candidate rejected"
                );
                let counts = &mut self.stats.rejected;
                match reason {
                    Rejection::UnknownReference => counts.unknown_reference += 1,
                    Rejection::UndatedReference => counts.undated_reference += 1,
                    Rejection::TemporalViolation => counts.temporal_violation += 1,
                    Rejection::Duplicate => counts.duplicate += 1,
                }
            }
        }

        verdict
    }

    fn judge(&mut self, candidate: &EdgeCandidate) -> Verdict {
        let source = self.index.status(&candidate.source);
        let target = self.index.status(&candidate.target);

        // Gates 1-4
        let mut reason = None;
        for (id, status) in [(&candidate.source, source), (&candidate.target, target)] {
            match status {
                NodeStatus::Unknown => {
                    self.missing_ids.insert(id.clone());
                    reason = Some(Rejection::UnknownReference);
                }
                NodeStatus::Undated => {
                    self.missing_ids.insert(id.clone());
                    reason.get_or_insert(Rejection::UndatedReference);
                }
                NodeStatus::Dated(_) => {}
            }
        }

        let (NodeStatus::Dated(source_date), NodeStatus::Dated(target_date)) = (source, target)
        else {
            return Verdict::Rejected(reason.unwrap_or(Rejection::UnknownReference));
        };

        // Gate 5
        if source_date > target_date {
            return Verdict::Rejected(Rejection::TemporalViolation);
        }

        // Gate 6
        let pair = (candidate.source.clone(), candidate.target.clone());
        if !self.seen.insert(pair) {
            return Verdict::Rejected(Rejection::Duplicate);
        }

        Verdict::Accepted
    }

    /// Accepted candidates so far
    pub fn accepted(&self) -> &[EdgeCandidate] {
        &self.accepted
    }

    /// Finish the pass
    pub fn finish(self) -> FilterOutcome {
        debug!(
            candidates = self.stats.candidates,
            accepted = self.stats.accepted,
            rejected = self.stats.rejected_total(),
            missing_ids = self.missing_ids.len(),
            "Filter pass complete"
        );

        FilterOutcome {
            accepted: self.accepted,
            missing_ids: self.missing_ids,
            stats: self.stats,
        }
    }
}

/// Filter candidates against a prebuilt node index
pub fn filter_edges(index: &NodeIndex, candidates: &[EdgeCandidate]) -> FilterOutcome {
    let mut filter = EdgeFilter::new(index);
    for candidate in candidates {
        filter.offer(candidate);
    }
    filter.finish()
}

/// Index `nodes` and filter `candidates` in one call
pub fn filter(nodes: &[Node], candidates: &[EdgeCandidate]) -> FilterOutcome {
    let index = NodeIndex::build(nodes);
    filter_edges(&index, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nodes() -> Vec<Node> {
        vec![
            Node::new("A", "2020-01-01"),
            Node::new("B", "2021-01-01"),
            Node::new("C", "2022-01-01"),
        ]
    }

    fn edge(source: &str, target: &str) -> EdgeCandidate {
        EdgeCandidate::new(source, target)
    }

    fn missing(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_temporal_violation_dropped() {
        let outcome = filter(&nodes(), &[edge("A", "B"), edge("B", "A")]);
        assert_eq!(outcome.accepted, vec![edge("A", "B")]);
        assert!(outcome.missing_ids.is_empty());
        assert_eq!(outcome.stats.rejected.temporal_violation, 1);
    }

    #[test]
    fn test_duplicate_dropped() {
        let outcome = filter(&nodes(), &[edge("A", "B"), edge("A", "B")]);
        assert_eq!(outcome.accepted, vec![edge("A", "B")]);
        assert!(outcome.missing_ids.is_empty());
        assert_eq!(outcome.stats.rejected.duplicate, 1);
    }

    #[test]
    fn test_unknown_target_recorded() {
        let outcome = filter(&nodes(), &[edge("A", "D")]);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.missing_ids, missing(&["D"]));
        assert!(!outcome.is_clean());
    }

    #[test]
    fn test_newer_source_rejected_silently() {
        let outcome = filter(&nodes(), &[edge("C", "B")]);
        assert!(outcome.accepted.is_empty());
        assert!(outcome.missing_ids.is_empty());
    }

    #[test]
    fn test_unparsable_date_is_missing() {
        let mut nodes = nodes();
        nodes.push(Node::new("E", "unknown"));
        let outcome = filter(&nodes, &[edge("A", "E")]);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.missing_ids, missing(&["E"]));
        assert_eq!(outcome.stats.rejected.undated_reference, 1);
    }

    #[test]
    fn test_both_endpoints_recorded() {
        let outcome = filter(&nodes(), &[edge("X", "Y")]);
        assert_eq!(outcome.missing_ids, missing(&["X", "Y"]));

        let mut nodes = nodes();
        nodes.push(Node::undated("E"));
        let outcome = filter(&nodes, &[edge("X", "E")]);
        assert_eq!(outcome.missing_ids, missing(&["E", "X"]));
        assert_eq!(outcome.stats.rejected.unknown_reference, 1);
    }

    #[test]
    fn test_equal_dates_and_self_loops_allowed() {
        let nodes = vec![Node::new("A", "2020-01-01"), Node::new("A2", "2020-01-01")];
        let outcome = filter(&nodes, &[edge("A", "A2"), edge("A2", "A"), edge("A", "A")]);
        assert_eq!(outcome.accepted.len(), 3);
    }

    #[test]
    fn test_first_payload_wins() {
        let first = edge("A", "B").with_payload("note", json!("first"));
        let second = edge("A", "B").with_payload("note", json!("second"));
        let outcome = filter(&nodes(), &[first.clone(), second]);
        assert_eq!(outcome.accepted, vec![first]);
    }

    #[test]
    fn test_order_preserved() {
        let candidates = [edge("B", "C"), edge("D", "C"), edge("A", "C"), edge("A", "B")];
        let outcome = filter(&nodes(), &candidates);
        assert_eq!(outcome.accepted, vec![edge("B", "C"), edge("A", "C"), edge("A", "B")]);
    }

    #[test]
    fn test_empty_inputs() {
        let outcome = filter(&[], &[]);
        assert_eq!(outcome, FilterOutcome::default());

        let outcome = filter(&nodes(), &[]);
        assert!(outcome.accepted.is_empty());

        let outcome = filter(&[], &[edge("A", "B")]);
        assert_eq!(outcome.missing_ids, missing(&["A", "B"]));
    }

    #[test]
    fn test_offer_verdicts() {
        let index = NodeIndex::build(&nodes());
        let mut filter = EdgeFilter::new(&index);

        assert_eq!(filter.offer(&edge("A", "B")), Verdict::Accepted);
        assert_eq!(filter.offer(&edge("A", "B")), Verdict::Rejected(Rejection::Duplicate));
        assert_eq!(filter.offer(&edge("C", "A")), Verdict::Rejected(Rejection::TemporalViolation));
        assert_eq!(filter.offer(&edge("A", "Z")), Verdict::Rejected(Rejection::UnknownReference));
        assert_eq!(filter.accepted().len(), 1);

        let outcome = filter.finish();
        assert_eq!(outcome.stats.candidates, 4);
        assert_eq!(outcome.stats.rejected_total(), 3);
    }

    #[test]
    fn test_rejections_that_report_ids() {
        assert!(Rejection::UnknownReference.records_missing());
        assert!(Rejection::UndatedReference.records_missing());
        assert!(!Rejection::TemporalViolation.records_missing());
        assert!(!Rejection::Duplicate.records_missing());
    }

    #[test]
    fn test_inputs_untouched() {
        let nodes = nodes();
        let candidates = vec![edge("B", "A"), edge("A", "B")];
        let before = candidates.clone();
        let _ = filter(&nodes, &candidates);
        assert_eq!(candidates, before);
    }
}
