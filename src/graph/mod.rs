//! Knowledge-graph documents
//!
//! - [`GraphAnalyzer`]: structural metrics over any graph-shaped JSON
//! - [`KnowledgeGraph`] / [`ValidationMetadata`]: typed bundle shapes
//!
//! ## Graph document shape
//!
//! ```text
//! { "metadata": {..},
//!   "nodes":         [ { "id", "type", "properties": {..} } ],
//!   "relationships": [ { "source", "target", "type", "properties": {..} } ] }
//! ```

mod analyzer;
mod model;

pub use analyzer::{GraphAnalyzer, GraphMetrics};
pub use model::{
    GraphMetadata, KnowledgeGraph, Node, Relationship, ValidationMetadata, ValidationMetrics,
};

/// Unwrap a response wrapped in a Markdown code fence.
///
/// Handles ```` ```json\n … \n``` ```` and bare ```` ``` … ``` ````;
/// anything else is returned unchanged.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(inner) = trimmed
        .strip_prefix("```json\n")
        .and_then(|rest| rest.strip_suffix("\n```"))
    {
        return inner;
    }
    if trimmed.len() >= 6 {
        if let Some(inner) = trimmed.strip_prefix("```").and_then(|rest| rest.strip_suffix("```")) {
            return inner;
        }
    }
    text
}
