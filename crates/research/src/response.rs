//! Tolerant parsing of model output
//!
//! Models asked for "only JSON" still wrap it in code fences, surround it
//! with prose, emit several objects separated by commas, or return an array.
//! Every JSON object or array found in the text is collected; arrays are
//! flattened into their elements.

use crate::errors::ResearchError;
use lineage_common::models::EdgeCandidate;
use regex_lite::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Key marking a model id the paper introduces that is not yet a node
pub const MISSING_NODE_KEY: &str = "Missing node";

/// Edges and new ids proposed for one paper
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Proposals {
    pub candidates: Vec<EdgeCandidate>,
    pub missing_nodes: Vec<String>,
}

/// Bodies of fenced code blocks, or the whole text when there are none
fn strip_fences(text: &str) -> Vec<&str> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(fence) = FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").ok())
        .as_ref()
    else {
        return vec![text];
    };
    let bodies: Vec<&str> = fence
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if bodies.is_empty() {
        vec![text]
    } else {
        bodies
    }
}

/// Every top-level JSON object or array in `text`, in order
pub fn extract_json_values(text: &str) -> Vec<Value> {
    let mut values = Vec::new();

    for body in strip_fences(text) {
        let mut pos = 0;
        while let Some(offset) = body[pos..].find(['{', '[']) {
            let start = pos + offset;
            match first_value(&body[start..]) {
                Some((value, consumed)) => {
                    pos = start + consumed;
                    values.push(value);
                }
                None => pos = start + 1,
            }
        }
    }

    values
}

/// The JSON value at the start of `fragment` and the bytes it spans
fn first_value(fragment: &str) -> Option<(Value, usize)> {
    if let Some(found) = parse_leading(fragment) {
        return Some(found);
    }

    // Models often emit raw line breaks inside string literals
    let (escaped, origins) = escape_controls(fragment)?;
    let (value, consumed) = parse_leading(&escaped)?;
    let original = origins
        .iter()
        .find(|(at, _)| *at >= consumed)
        .map_or(fragment.len(), |(_, from)| *from);
    Some((value, original))
}

fn parse_leading(fragment: &str) -> Option<(Value, usize)> {
    let mut stream = serde_json::Deserializer::from_str(fragment).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Some((value, stream.byte_offset())),
        _ => None,
    }
}

/// Escape control characters inside string literals.
///
/// Returns the rewritten text with `(rewritten offset, original offset)` for
/// every char, or `None` when nothing needed escaping.
fn escape_controls(fragment: &str) -> Option<(String, Vec<(usize, usize)>)> {
    let mut out = String::with_capacity(fragment.len());
    let mut origins = Vec::with_capacity(fragment.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut changed = false;

    for (from, c) in fragment.char_indices() {
        origins.push((out.len(), from));

        if in_string && !escaped && c < ' ' {
            changed = true;
            match c {
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                other => out.push_str(&format!("\\u{:04x}", u32::from(other))),
            }
            continue;
        }

        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }

    changed.then_some((out, origins))
}

fn flatten(values: Vec<Value>) -> Vec<Value> {
    let mut out = Vec::new();
    for value in values {
        match value {
            Value::Array(items) => out.extend(flatten(items)),
            other => out.push(other),
        }
    }
    out
}

fn malformed(text: &str) -> ResearchError {
    let preview: String = text.chars().take(120).collect();
    ResearchError::MalformedResponse {
        message: format!("no JSON found in response: {:?}", preview),
    }
}

/// Parse the source-model answer into candidate edges and missing-node markers.
///
/// Objects with string `source` and `target` become candidates (extra fields
/// are kept as payload). `{"Missing node": id}` objects name ids the paper
/// introduces. A `{"links": [...]}` wrapper is unwrapped. Anything else is
/// ignored.
pub fn parse_proposals(text: &str) -> Result<Proposals, ResearchError> {
    let values = extract_json_values(text);
    if values.is_empty() {
        return Err(malformed(text));
    }

    let mut proposals = Proposals::default();
    let mut queue = flatten(values);
    let mut ignored = 0usize;

    while let Some(value) = queue.pop() {
        let Value::Object(mut map) = value else {
            ignored += 1;
            continue;
        };

        if let Some(Value::Array(links)) = map.remove("links") {
            queue.extend(flatten(links));
            continue;
        }

        if let Some(Value::String(id)) = map.get(MISSING_NODE_KEY) {
            if !proposals.missing_nodes.contains(id) {
                proposals.missing_nodes.push(id.clone());
            }
            continue;
        }

        match EdgeCandidate::try_from(Value::Object(map)) {
            Ok(candidate) => proposals.candidates.push(candidate),
            Err(_) => ignored += 1,
        }
    }

    // Values were popped from the back
    proposals.candidates.reverse();
    proposals.missing_nodes.reverse();

    debug!(
        candidates = proposals.candidates.len(),
        missing_nodes = proposals.missing_nodes.len(),
        ignored,
        "Parsed source proposals"
    );
    Ok(proposals)
}

/// Parse the summary answer into `(model id, summary)` pairs
pub fn parse_summary(text: &str) -> Result<Vec<(String, String)>, ResearchError> {
    let pairs: Vec<(String, String)> = flatten(extract_json_values(text))
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .flat_map(|map| {
            map.into_iter().filter_map(|(id, summary)| match summary {
                Value::String(summary) => Some((id, summary)),
                _ => None,
            })
        })
        .collect();

    if pairs.is_empty() {
        return Err(malformed(text));
    }
    Ok(pairs)
}
