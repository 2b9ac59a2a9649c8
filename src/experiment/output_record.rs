//! Output Record - named, typed, string-serialized result facts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Declared datatype of a stored value.
///
/// Values are always stored as strings; readers parse them back
/// according to this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// UTF-8 text
    Str,
    /// Signed integer
    Int,
    /// Floating point
    Float,
}

impl DataType {
    /// Storage form of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(Self::Str),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            other => Err(Error::Storage(format!("unknown datatype tag '{other}'"))),
        }
    }
}

/// An output value parsed back from its string form.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    /// Text value
    Str(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
}

/// Output Record represents one result fact attached to a run.
///
/// Per-model outputs are namespaced by the model identifier, e.g.
/// `openai:gpt-4o_response` or `openai:gpt-4o_node_count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputRecord {
    name: String,
    value: String,
    datatype: DataType,
}

impl OutputRecord {
    /// Create an output from an already-serialized value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            datatype,
        }
    }

    /// Text output.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, DataType::Str)
    }

    /// Integer output.
    #[must_use]
    pub fn int(name: impl Into<String>, value: impl Into<i64>) -> Self {
        Self::new(name, value.into().to_string(), DataType::Int)
    }

    /// Float output.
    #[must_use]
    pub fn float(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value.to_string(), DataType::Float)
    }

    /// Get the output name.
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

    /// Parse the stored string back according to the declared datatype.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the value does not parse as its tag.
    pub fn typed_value(&self) -> crate::Result<OutputValue> {
        match self.datatype {
            DataType::Str => Ok(OutputValue::Str(self.value.clone())),
            DataType::Int => self.value.parse().map(OutputValue::Int).map_err(|e| {
                Error::Storage(format!("output '{}' is not an int: {e}", self.name))
            }),
            DataType::Float => self.value.parse().map(OutputValue::Float).map_err(|e| {
                Error::Storage(format!("output '{}' is not a float: {e}", self.name))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_output_round_trips() {
        let output = OutputRecord::int("m_input_tokens", 17);
        assert_eq!(output.value(), "17");
        assert_eq!(output.datatype(), DataType::Int);
        assert_eq!(output.typed_value().unwrap(), OutputValue::Int(17));
    }

    #[test]
    fn test_float_output_parses_back() {
        let output = OutputRecord::float("m_elapsed_time", 1.25);
        assert_eq!(output.typed_value().unwrap(), OutputValue::Float(1.25));
    }

    #[test]
    fn test_mistyped_value_is_an_error() {
        let output = OutputRecord::new("m_output_tokens", "many", DataType::Int);
        assert!(output.typed_value().is_err());
    }

    #[test]
    fn test_datatype_tags() {
        assert_eq!(DataType::Float.to_string(), "float");
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!(serde_json::to_string(&DataType::Str).unwrap(), "\"str\"");
    }
}
