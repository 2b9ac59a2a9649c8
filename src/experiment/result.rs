//! Result views returned by the orchestrator and the query API

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExperimentRun, ExperimentSpec, RunId, RunStatus};
use crate::graph::GraphMetrics;

/// Token accounting for one model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    /// Tokens across the system and user messages.
    pub input: usize,
    /// Tokens in the response text; 0 when the call failed.
    pub output: usize,
    /// `input + output`.
    pub total: usize,
}

impl TokenCounts {
    /// Counts for a successful call.
    #[must_use]
    pub const fn new(input: usize, output: usize) -> Self {
        Self {
            input,
            output,
            total: input + output,
        }
    }

    /// Counts for a failed call: output is never computed.
    #[must_use]
    pub const fn input_only(input: usize) -> Self {
        Self::new(input, 0)
    }
}

/// Outcome of one model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// The provider returned a completion.
    Success,
    /// The provider call failed; `response` holds the rendered failure.
    Error,
}

/// Per-model result. Derived into outputs and echoed in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    /// Model identifier as submitted.
    pub model: String,
    /// Success or error.
    pub status: ModelStatus,
    /// Completion text, or the rendered failure message.
    pub response: String,
    /// Wall-clock seconds spent in the provider call; 0 on failure.
    pub elapsed_time: f64,
    /// Token accounting.
    pub token_counts: TokenCounts,
    /// Structural metrics when the response parsed as a graph document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_metrics: Option<GraphMetrics>,
}

impl ModelResult {
    /// True if the provider call succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ModelStatus::Success
    }
}

/// Aggregated result of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Run identifier assigned by the store.
    pub experiment_id: RunId,
    /// The submitted spec, echoed back.
    pub experiment_config: ExperimentSpec,
    /// One entry per model, in submission order. Empty after a run-level failure.
    pub results: Vec<ModelResult>,
    /// Final run status.
    pub status: RunStatus,
    /// Run-level failure text, if the run itself failed.
    pub error_details: Option<String>,
    /// Successful models whose response could not be graph-analysed.
    #[serde(default)]
    pub skipped_enrichments: usize,
}

/// Row of the run listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub id: RunId,
    /// Run name.
    pub name: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Description, if any.
    pub description: Option<String>,
    /// Current status.
    pub status: RunStatus,
}

impl From<&ExperimentRun> for RunSummary {
    fn from(run: &ExperimentRun) -> Self {
        Self {
            id: run.id(),
            name: run.name().to_string(),
            timestamp: run.timestamp(),
            description: run.description().map(str::to_string),
            status: run.status(),
        }
    }
}

/// Run detail with parameters and outputs flattened to name → value.
///
/// When a name repeats, the last attached value wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDetail {
    /// Summary fields.
    #[serde(flatten)]
    pub summary: RunSummary,
    /// Parameter name → value.
    pub parameters: BTreeMap<String, String>,
    /// Output name → value.
    pub outputs: BTreeMap<String, String>,
}

impl From<&ExperimentRun> for RunDetail {
    fn from(run: &ExperimentRun) -> Self {
        Self {
            summary: RunSummary::from(run),
            parameters: run
                .parameters()
                .iter()
                .map(|p| (p.name().to_string(), p.value().to_string()))
                .collect(),
            outputs: run
                .outputs()
                .iter()
                .map(|o| (o.name().to_string(), o.value().to_string()))
                .collect(),
        }
    }
}
