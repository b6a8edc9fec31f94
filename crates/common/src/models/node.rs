//! Model node in the lineage graph

use chrono::NaiveDate;
use regex_lite::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use validator::Validate;

use crate::DATE_FORMAT;

/// A language model with its publication date.
///
/// Fields other than `id` and `date` (`name`, `link`, `properties`, ...) are
/// kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Node {
    #[serde(default)]
    #[validate(length(min = 1, message = "node id must not be empty"))]
    pub id: String,

    /// Publication date, `YYYY-MM-DD`. Non-string values read as absent.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: Some(date.into()),
            extra: Map::new(),
        }
    }

    /// A node without any date
    pub fn undated(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: None,
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Paper link, when the node carries one
    pub fn link(&self) -> Option<&str> {
        self.extra.get("link").and_then(Value::as_str)
    }

    /// Publication date, or `None` when absent or malformed
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .filter(|d| date_shape().is_some_and(|re| re.is_match(d)))
            .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
    }
}

/// Digits only: chrono alone also takes a sign or leading whitespace
fn date_shape() -> Option<&'static Regex> {
    static DATE_SHAPE: OnceLock<Option<Regex>> = OnceLock::new();
    DATE_SHAPE
        .get_or_init(|| Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").ok())
        .as_ref()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}
