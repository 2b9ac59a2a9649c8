//! Structural metrics over graph-shaped JSON documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// The four structural metrics of a graph document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// Length of `nodes`.
    pub node_count: usize,
    /// Length of `relationships`.
    pub relationship_count: usize,
    /// Sum of property-map sizes across nodes.
    pub node_property_count: usize,
    /// Sum of property-map sizes across relationships.
    pub relationship_property_count: usize,
}

impl GraphMetrics {
    /// Metric name/value pairs in a fixed order.
    #[must_use]
    pub const fn pairs(&self) -> [(&'static str, usize); 4] {
        [
            ("node_count", self.node_count),
            ("relationship_count", self.relationship_count),
            ("node_property_count", self.node_property_count),
            ("relationship_property_count", self.relationship_property_count),
        ]
    }
}

/// Computes [`GraphMetrics`] from a parsed document.
///
/// Missing `nodes`/`relationships` count as empty lists and a missing
/// `properties` counts as an empty map. Present-but-wrong-shaped fields
/// are `Error::GraphShape`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphAnalyzer;

impl GraphAnalyzer {
    /// Analyze a document.
    ///
    /// # Errors
    ///
    /// Returns `Error::GraphShape` if the document is not an object,
    /// `nodes`/`relationships` is not a list, an element is not an object,
    /// or `properties` is not an object.
    pub fn analyze(document: &Value) -> Result<GraphMetrics> {
        let root = document
            .as_object()
            .ok_or_else(|| Error::GraphShape(format!("expected an object, got {}", kind(document))))?;

        let (node_count, node_property_count) = Self::count(root, "nodes")?;
        let (relationship_count, relationship_property_count) =
            Self::count(root, "relationships")?;

        Ok(GraphMetrics {
            node_count,
            relationship_count,
            node_property_count,
            relationship_property_count,
        })
    }

    /// (element count, total property count) for one list field.
    fn count(root: &Map<String, Value>, field: &str) -> Result<(usize, usize)> {
        let Some(value) = root.get(field) else {
            return Ok((0, 0));
        };
        let items = value.as_array().ok_or_else(|| {
            Error::GraphShape(format!("'{field}' must be a list, got {}", kind(value)))
        })?;

        let mut properties = 0;
        for (i, item) in items.iter().enumerate() {
            let item = item.as_object().ok_or_else(|| {
                Error::GraphShape(format!("'{field}[{i}]' must be an object, got {}", kind(item)))
            })?;
            properties += match item.get("properties") {
                None => 0,
                Some(Value::Object(props)) => props.len(),
                Some(other) => {
                    return Err(Error::GraphShape(format!(
                        "'{field}[{i}].properties' must be an object, got {}",
                        kind(other)
                    )))
                }
            };
        }
        Ok((items.len(), properties))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
