//! Candidate lineage edge

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;

/// "`source` influenced `target`", plus whatever payload the producer attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCandidate {
    pub source: String,
    pub target: String,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl EdgeCandidate {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            payload: Map::new(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The `(source, target)` pair used for duplicate detection
    pub fn pair(&self) -> (&str, &str) {
        (&self.source, &self.target)
    }
}

impl TryFrom<Value> for EdgeCandidate {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut map) = value else {
            return Err(AppError::InvalidFormat {
                message: "link is not a JSON object".to_string(),
            });
        };

        let mut take = |field: &str| match map.remove(field) {
            Some(Value::String(s)) => Ok(s),
            _ => Err(AppError::MissingField {
                field: field.to_string(),
            }),
        };

        let source = take("source")?;
        let target = take("target")?;

        Ok(Self {
            source,
            target,
            payload: map,
        })
    }
}
