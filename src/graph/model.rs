//! Strongly-typed shapes for knowledge-graph bundles.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Provenance block of a knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// When the graph was produced. Accepts RFC 3339 or a naive ISO
    /// timestamp, which is read as UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Where the source text came from.
    pub source: String,
    /// Date of the source.
    pub date: String,
}

/// A graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: String,
    /// Entity type.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Free-form properties.
    pub properties: Map<String, Value>,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relationship type.
    #[serde(rename = "type")]
    pub relationship_type: String,
    /// Free-form properties; empty when absent.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A ground-truth knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    /// Provenance.
    pub metadata: GraphMetadata,
    /// Entities.
    pub nodes: Vec<Node>,
    /// Edges.
    pub relationships: Vec<Relationship>,
}

/// Expected shape of the graph for an evaluation case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// Number of entities the graph should contain.
    pub expected_entity_count: i64,
    /// Number of relationships the graph should contain.
    pub expected_relationship_count: i64,
    /// Entity types that must appear.
    pub entity_types: Vec<String>,
    /// Relationship types that must appear.
    pub key_relationships: Vec<String>,
}

/// Metadata describing one evaluation case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMetadata {
    /// Case identifier.
    pub id: String,
    /// Subject domain.
    pub domain: String,
    /// Complexity tier.
    pub complexity: String,
    /// Expectations on the graph.
    pub metrics: ValidationMetrics,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Creation date.
    pub created: String,
    /// Case format version.
    pub version: String,
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}
