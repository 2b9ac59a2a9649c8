//! Validation of evaluation-case bundles.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::graph::{KnowledgeGraph, ValidationMetadata};

/// Metadata document inside a bundle.
pub const METADATA_FILE: &str = "metadata.json";
/// Ground-truth graph document inside a bundle.
pub const GRAPH_FILE: &str = "ground_truth_graph.json";
/// Source text the graph was extracted from.
pub const SOURCE_FILE: &str = "source.txt";

/// Files every bundle must contain.
pub const REQUIRED_FILES: [&str; 3] = [METADATA_FILE, GRAPH_FILE, SOURCE_FILE];

/// Result of validating one bundle.
///
/// `metadata` and `graph` are populated independently for whichever side
/// parsed successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleReport {
    /// Both documents parsed into their typed shapes.
    pub is_valid: bool,
    /// One entry per failed check, empty when valid.
    pub errors: Vec<String>,
    /// Parsed metadata, if it was valid.
    pub metadata: Option<ValidationMetadata>,
    /// Parsed ground-truth graph, if it was valid.
    pub graph: Option<KnowledgeGraph>,
}

impl BundleReport {
    fn incomplete(error: String) -> Self {
        Self {
            is_valid: false,
            errors: vec![error],
            metadata: None,
            graph: None,
        }
    }
}

/// Checks a bundle directory as a unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphValidator;

impl GraphValidator {
    /// Validate the bundle at `bundle_path`.
    ///
    /// A bundle missing any required file fails with a single error and
    /// nothing is parsed. Otherwise the metadata and graph documents are
    /// checked independently and every failure is reported.
    #[must_use]
    pub fn validate_bundle(bundle_path: impl AsRef<Path>) -> (bool, BundleReport) {
        let dir = bundle_path.as_ref();

        let missing: Vec<&str> = REQUIRED_FILES
            .into_iter()
            .filter(|file| !dir.join(file).is_file())
            .collect();
        if !missing.is_empty() {
            debug!(bundle = %dir.display(), ?missing, "bundle incomplete");
            let report = BundleReport::incomplete(format!(
                "Directory {} is missing required files",
                dir.display()
            ));
            return (false, report);
        }

        let mut errors = Vec::new();
        let metadata = load::<ValidationMetadata>(dir, METADATA_FILE, &mut errors);
        let graph = load::<KnowledgeGraph>(dir, GRAPH_FILE, &mut errors);

        let is_valid = errors.is_empty();
        info!(bundle = %dir.display(), is_valid, errors = errors.len(), "validated bundle");
        let report = BundleReport {
            is_valid,
            errors,
            metadata,
            graph,
        };
        (is_valid, report)
    }
}

fn load<T: DeserializeOwned>(dir: &Path, file: &str, errors: &mut Vec<String>) -> Option<T> {
    match super::read_json(&dir.join(file)) {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(format!("Error validating {file}: {e}"));
            None
        }
    }
}
