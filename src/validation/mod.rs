//! Validation of graph and evaluation-metadata documents
//!
//! - [`SchemaValidator`]: JSON text against a named JSON Schema, with the
//!   failing rule and value located by path
//! - [`GraphValidator`]: a whole evaluation bundle (metadata, ground-truth
//!   graph, source text) checked as a unit
//!
//! Neither validator returns an error to its caller. Every problem is part
//! of the verdict.
//!
//! ## Example
//!
//! ```rust
//! use llm_eval::validation::{SchemaName, SchemaValidator};
//!
//! let validator = SchemaValidator::bundled().unwrap();
//! let outcome = validator.validate("not json", SchemaName::GraphFormat);
//! assert!(!outcome.is_valid);
//! ```

mod bundle;
mod schema;

pub use bundle::{
    BundleReport, GraphValidator, GRAPH_FILE, METADATA_FILE, REQUIRED_FILES, SOURCE_FILE,
};
pub use schema::{SchemaName, SchemaValidator, ValidationOutcome, PATH_SEPARATOR, ROOT_PATH};

use std::path::Path;

use serde::de::DeserializeOwned;

/// Read and deserialize a JSON file.
fn read_json<T: DeserializeOwned>(path: &Path) -> crate::Result<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
