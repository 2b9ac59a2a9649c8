//! Experiment Spec - what a caller submits to the orchestrator

use serde::{Deserialize, Serialize};

use super::ParameterRecord;
use crate::provider::ChatMessage;
use crate::{Error, Result};

/// One experiment request: a prompt pair fanned out over a model list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentSpec {
    /// Optional run name; the store generates one from the run id otherwise.
    #[serde(default)]
    pub name: Option<String>,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// System message content.
    pub system_prompt: String,
    /// User message content.
    pub user_prompt: String,
    /// Provider-qualified model identifiers, invoked in this order.
    pub models: Vec<String>,
}

impl ExperimentSpec {
    /// Create a spec with the required fields.
    #[must_use]
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        models: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: None,
            description: None,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            models: models.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the run name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the run description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the spec invariants.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSpec` if either prompt is empty, the model
    /// list is empty, or a model identifier is blank.
    pub fn validate(&self) -> Result<()> {
        if self.system_prompt.trim().is_empty() {
            return Err(Error::InvalidSpec("system_prompt must not be empty".into()));
        }
        if self.user_prompt.trim().is_empty() {
            return Err(Error::InvalidSpec("user_prompt must not be empty".into()));
        }
        if self.models.is_empty() {
            return Err(Error::InvalidSpec("at least one model is required".into()));
        }
        if let Some(pos) = self.models.iter().position(|m| m.trim().is_empty()) {
            return Err(Error::InvalidSpec(format!("model at index {pos} is blank")));
        }
        Ok(())
    }

    /// The three canonical input parameters recorded for every run.
    #[must_use]
    pub fn parameters(&self) -> Vec<ParameterRecord> {
        vec![
            ParameterRecord::text("system_prompt", &self.system_prompt),
            ParameterRecord::text("user_prompt", &self.user_prompt),
            ParameterRecord::text("models", self.models.join(",")),
        ]
    }

    /// System message followed by user message.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(&self.user_prompt),
        ]
    }
}
