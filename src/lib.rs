//! # llm-eval: Experiment Tracking for LLM Output Comparison
//!
//! **Version**: 0.3.0
//!
//! llm-eval fans a system/user prompt pair out over a list of
//! provider-qualified models, records timing, token and graph-structure
//! metrics per model, and persists every run for later comparison.
//! A validation layer checks knowledge-graph and evaluation-metadata
//! documents against fixed JSON Schemas.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: A failing model stops its own line, never the run
//! - **Genchi Genbutsu**: Inputs are snapshotted before any model is called
//! - **Poka-Yoke**: Validation never throws; every problem is a verdict
//!
//! ## Example Usage
//!
//! ```rust
//! use llm_eval::graph::GraphAnalyzer;
//! use llm_eval::validation::{SchemaName, SchemaValidator};
//! use serde_json::json;
//!
//! let metrics = GraphAnalyzer::analyze(&json!({"nodes": [{"properties": {"a": 1}}]}))?;
//! assert_eq!(metrics.node_count, 1);
//!
//! let validator = SchemaValidator::bundled()?;
//! assert!(!validator.validate("{}", SchemaName::GraphFormat).is_valid);
//! # Ok::<(), llm_eval::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod experiment;
pub mod graph;
pub mod http;
pub mod provider;
pub mod tokens;
pub mod validation;

pub use error::{Error, Result};
