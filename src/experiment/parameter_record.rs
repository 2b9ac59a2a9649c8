//! Parameter Record - input facts snapshotted when a run is created

use serde::{Deserialize, Serialize};

use super::DataType;

/// Parameter Record represents one input fact of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterRecord {
    name: String,
    value: String,
    datatype: DataType,
}

impl ParameterRecord {
    /// Create a new parameter record.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            datatype,
        }
    }

    /// Text parameter.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, DataType::Str)
    }

    /// Get the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the string-serialized value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the declared datatype.
    #[must_use]
    pub const fn datatype(&self) -> DataType {
        self.datatype
    }
}
