//! Run Record - one orchestrator invocation across a model list

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OutputRecord, ParameterRecord};
use crate::Error;

/// Store-assigned run identifier.
pub type RunId = i64;

/// Status of a run.
///
/// A run is created `Running` and finalized to `Completed` only when no
/// model failed. Any failure leaves it at `Error` for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run is currently executing.
    Running,
    /// Every model call succeeded.
    Completed,
    /// At least one model call failed, or the run itself failed.
    Error,
}

impl RunStatus {
    /// Wire/storage form of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }

    /// Final status for a run given how many of its models failed.
    #[must_use]
    pub const fn rollup(failures: usize) -> Self {
        if failures == 0 {
            Self::Completed
        } else {
            Self::Error
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "ERROR" => Ok(Self::Error),
            other => Err(Error::Storage(format!("unknown run status '{other}'"))),
        }
    }
}

/// Experiment Run represents a single persisted execution.
///
/// Parameters and outputs are owned by the run and kept in insertion
/// order. Deleting the run deletes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRun {
    id: RunId,
    name: String,
    timestamp: DateTime<Utc>,
    description: Option<String>,
    status: RunStatus,
    parameters: Vec<ParameterRecord>,
    outputs: Vec<OutputRecord>,
}

impl ExperimentRun {
    /// Create a new run in `Running` status with the current timestamp.
    ///
    /// A missing name becomes `"Experiment #<id>"`.
    #[must_use]
    pub fn new(id: RunId, name: Option<&str>, description: Option<&str>) -> Self {
        Self::builder(id, name.map_or_else(|| Self::default_name(id), str::to_string))
            .description(description.map(str::to_string))
            .build()
    }

    /// Create a builder for constructing a run with explicit fields.
    #[must_use]
    pub fn builder(id: RunId, name: impl Into<String>) -> ExperimentRunBuilder {
        ExperimentRunBuilder::new(id, name)
    }

    /// Placeholder name for unnamed runs.
    #[must_use]
    pub fn default_name(id: RunId) -> String {
        format!("Experiment #{id}")
    }

    /// Get the run ID.
    #[must_use]
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// Get the run name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Get the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Parameters in the order they were attached.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterRecord] {
        &self.parameters
    }

    /// Outputs in the order they were attached.
    #[must_use]
    pub fn outputs(&self) -> &[OutputRecord] {
        &self.outputs
    }

    /// Find the most recently attached output with this name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputRecord> {
        self.outputs.iter().rev().find(|o| o.name() == name)
    }

    /// Append parameters.
    pub fn attach_parameters(&mut self, parameters: impl IntoIterator<Item = ParameterRecord>) {
        self.parameters.extend(parameters);
    }

    /// Append outputs.
    pub fn attach_outputs(&mut self, outputs: impl IntoIterator<Item = OutputRecord>) {
        self.outputs.extend(outputs);
    }

    /// Set the status.
    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
    }
}

/// Builder for `ExperimentRun`.
#[derive(Debug)]
pub struct ExperimentRunBuilder {
    id: RunId,
    name: String,
    timestamp: DateTime<Utc>,
    description: Option<String>,
    status: RunStatus,
    parameters: Vec<ParameterRecord>,
    outputs: Vec<OutputRecord>,
}

impl ExperimentRunBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: RunId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            timestamp: Utc::now(),
            description: None,
            status: RunStatus::Running,
            parameters: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Set a custom creation timestamp (useful for loading from storage).
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: Vec<ParameterRecord>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the outputs.
    #[must_use]
    pub fn outputs(mut self, outputs: Vec<OutputRecord>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Build the `ExperimentRun`.
    #[must_use]
    pub fn build(self) -> ExperimentRun {
        ExperimentRun {
            id: self.id,
            name: self.name,
            timestamp: self.timestamp,
            description: self.description,
            status: self.status,
            parameters: self.parameters,
            outputs: self.outputs,
        }
    }
}
