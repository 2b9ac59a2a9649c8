//! JSON-Schema validation against the fixed set of named schemas.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{Error, Result};

const GRAPH_FORMAT_SCHEMA: &str = include_str!("../../schemas/graph_format.json");
const EVALUATION_METADATA_SCHEMA: &str = include_str!("../../schemas/evaluation_metadata.json");

/// Separator between JSON-pointer segments in rendered paths.
pub const PATH_SEPARATOR: &str = " -> ";

/// Rendered form of an empty instance path (the document root).
pub const ROOT_PATH: &str = "$";

/// Which schema governs a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaName {
    /// Knowledge-graph documents
    GraphFormat,
    /// Evaluation-case metadata documents
    EvaluationMetadata,
}

impl SchemaName {
    /// Every schema name.
    pub const ALL: [Self; 2] = [Self::GraphFormat, Self::EvaluationMetadata];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GraphFormat => "graph_format",
            Self::EvaluationMetadata => "evaluation_metadata",
        }
    }

    /// File the schema is loaded from in a schema directory.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }

    const fn bundled(self) -> &'static str {
        match self {
            Self::GraphFormat => GRAPH_FORMAT_SCHEMA,
            Self::EvaluationMetadata => EVALUATION_METADATA_SCHEMA,
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownSchema(s.to_string()))
    }
}

/// Verdict of one validation.
///
/// Exactly one of `data` (valid) or `error` (invalid) is set. Schema
/// violations also carry the failing rule and value locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the document satisfied the schema.
    pub is_valid: bool,
    /// The parsed document, when valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// What went wrong, when invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Path within the schema to the failing rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
    /// Path within the document to the failing value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_path: Option<String>,
}

impl ValidationOutcome {
    fn valid(data: Value) -> Self {
        Self {
            is_valid: true,
            data: Some(data),
            error: None,
            schema_path: None,
            instance_path: None,
        }
    }

    fn invalid(error: String) -> Self {
        Self {
            is_valid: false,
            data: None,
            error: Some(error),
            schema_path: None,
            instance_path: None,
        }
    }

    fn violation(error: String, schema_path: String, instance_path: String) -> Self {
        Self {
            schema_path: Some(schema_path),
            instance_path: Some(instance_path),
            ..Self::invalid(error)
        }
    }
}

/// Validates JSON text against one of the named schemas.
///
/// Schemas are compiled once at construction. [`SchemaValidator::validate`]
/// never fails: every problem becomes an invalid [`ValidationOutcome`].
pub struct SchemaValidator {
    schemas: HashMap<SchemaName, JSONSchema>,
}

impl SchemaValidator {
    /// Validator over the schemas shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaLoad` if a bundled schema fails to compile.
    pub fn bundled() -> Result<Self> {
        Self::from_documents(SchemaName::ALL.into_iter().map(|name| {
            serde_json::from_str(name.bundled())
                .map(|doc| (name, doc))
                .map_err(|e| Error::SchemaLoad {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
        }))
    }

    /// Validator over `<name>.json` files in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaLoad` if either file is missing, unreadable,
    /// not JSON, or not a valid schema.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::from_documents(SchemaName::ALL.into_iter().map(|name| {
            let path = dir.join(name.file_name());
            let doc = super::read_json(&path).map_err(|e| Error::SchemaLoad {
                name: name.to_string(),
                reason: format!("{}: {e}", path.display()),
            })?;
            Ok((name, doc))
        }))
    }

    /// Validator over already-parsed schema documents. Every schema name
    /// must be supplied.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaLoad` if a document fails to load or compile,
    /// or a schema name is missing.
    pub fn from_documents(
        documents: impl IntoIterator<Item = Result<(SchemaName, Value)>>,
    ) -> Result<Self> {
        let mut schemas = HashMap::new();
        for entry in documents {
            let (name, document) = entry?;
            let compiled = JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(&document)
                .map_err(|e| Error::SchemaLoad {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            schemas.insert(name, compiled);
        }
        if let Some(missing) = SchemaName::ALL.into_iter().find(|n| !schemas.contains_key(n)) {
            return Err(Error::SchemaLoad {
                name: missing.to_string(),
                reason: "schema document not supplied".into(),
            });
        }
        debug!(count = schemas.len(), "compiled validation schemas");
        Ok(Self { schemas })
    }

    /// Validate `json_text` against `schema`.
    #[must_use]
    pub fn validate(&self, json_text: &str, schema: SchemaName) -> ValidationOutcome {
        self.try_validate(json_text, schema).unwrap_or_else(|e| {
            warn!(schema = %schema, error = %e, "unexpected validation failure");
            ValidationOutcome::invalid(format!("Unexpected error: {e}"))
        })
    }

    fn try_validate(&self, json_text: &str, schema: SchemaName) -> Result<ValidationOutcome> {
        let instance: Value = match serde_json::from_str(json_text) {
            Ok(value) => value,
            Err(e) => return Ok(ValidationOutcome::invalid(format!("Invalid JSON format: {e}"))),
        };

        let compiled = self
            .schemas
            .get(&schema)
            .ok_or_else(|| Error::UnknownSchema(schema.to_string()))?;

        let violation = match compiled.validate(&instance) {
            Ok(()) => None,
            Err(mut errors) => Some(errors.next().map(|e| {
                (
                    e.to_string(),
                    render_path(e.schema_path.into_vec(), ""),
                    render_path(e.instance_path.into_vec(), ROOT_PATH),
                )
            })),
        };

        match violation {
            None => Ok(ValidationOutcome::valid(instance)),
            Some(Some((error, schema_path, instance_path))) => {
                debug!(schema = %schema, %instance_path, "document failed validation");
                Ok(ValidationOutcome::violation(error, schema_path, instance_path))
            }
            Some(None) => Err(Error::Other("validator reported failure without an error".into())),
        }
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.schemas.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("SchemaValidator").field("schemas", &names).finish()
    }
}

fn render_path(segments: Vec<String>, empty: &str) -> String {
    if segments.is_empty() {
        empty.to_string()
    } else {
        segments.join(PATH_SEPARATOR)
    }
}
