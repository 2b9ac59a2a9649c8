//! Error types for llm-eval
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Provider call failures are deliberately absent here: they are isolated
//! per model and travel as [`crate::provider::ProviderFailure`] values.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// llm-eval error types
#[derive(Error, Debug)]
pub enum Error {
    /// Experiment spec rejected before any run was created
    #[error("Invalid experiment spec: {0}")]
    InvalidSpec(String),

    /// Schema name not in the fixed set
    #[error("Unknown schema: {0}\nExpected one of: graph_format, evaluation_metadata")]
    UnknownSchema(String),

    /// Schema document could not be loaded or compiled (fatal at startup)
    #[error("Failed to load schema '{name}': {reason}")]
    SchemaLoad {
        /// Schema name
        name: String,
        /// What went wrong
        reason: String,
    },

    /// Graph document has a present-but-wrong-shaped field
    #[error("Graph shape error: {0}")]
    GraphShape(String),

    /// Run store failure (orchestration-level)
    #[error("Storage error: {0}")]
    Storage(String),

    /// No run with this identifier
    #[error("Experiment run {0} not found")]
    RunNotFound(i64),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors caused by caller input rather than the system.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidSpec(_) | Self::UnknownSchema(_))
    }
}
