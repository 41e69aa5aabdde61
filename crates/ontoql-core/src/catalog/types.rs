//! Logical field types.

use ontoql_proto::ValueKind;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::fmt;

/// Logical type of an ontology field.
///
/// The type decides how raw request values are converted before binding.
/// Names outside the known set are kept verbatim in [`LogicalType::Other`]
/// and bound as strings.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
#[serde(from = "String", into = "String")]
pub enum LogicalType {
    /// Short string.
    String,
    /// Long text.
    Text,
    /// Boolean.
    Boolean,
    /// 32-bit integer (`integer` or `int`).
    Integer,
    /// 64-bit integer.
    Long,
    /// Arbitrary-precision decimal.
    Decimal,
    /// Arbitrary-precision decimal, alternative spelling.
    Numeric,
    /// UUID.
    Uuid,
    /// Offset timestamp or calendar date.
    Date,
    /// Any other type name, treated as a string.
    Other(String),
}

impl LogicalType {
    /// Parse a type name as found in ontology metadata (case-insensitive).
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" => LogicalType::String,
            "text" => LogicalType::Text,
            "boolean" => LogicalType::Boolean,
            "integer" | "int" => LogicalType::Integer,
            "long" => LogicalType::Long,
            "decimal" => LogicalType::Decimal,
            "numeric" => LogicalType::Numeric,
            "uuid" => LogicalType::Uuid,
            "date" => LogicalType::Date,
            _ => LogicalType::Other(name.to_string()),
        }
    }

    /// Canonical type name.
    pub fn as_str(&self) -> &str {
        match self {
            LogicalType::String => "string",
            LogicalType::Text => "text",
            LogicalType::Boolean => "boolean",
            LogicalType::Integer => "integer",
            LogicalType::Long => "long",
            LogicalType::Decimal => "decimal",
            LogicalType::Numeric => "numeric",
            LogicalType::Uuid => "uuid",
            LogicalType::Date => "date",
            LogicalType::Other(name) => name,
        }
    }

    /// Check if values of this type are bound as plain strings.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            LogicalType::String | LogicalType::Text | LogicalType::Other(_)
        )
    }

    /// Parameter type that values of this logical type are bound with.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            LogicalType::Boolean => ValueKind::Bool,
            LogicalType::Integer => ValueKind::Int32,
            LogicalType::Long => ValueKind::Int64,
            LogicalType::Decimal | LogicalType::Numeric => ValueKind::Decimal,
            LogicalType::Uuid => ValueKind::Uuid,
            LogicalType::Date => ValueKind::Date,
            LogicalType::String | LogicalType::Text | LogicalType::Other(_) => ValueKind::String,
        }
    }
}

impl From<String> for LogicalType {
    fn from(name: String) -> Self {
        LogicalType::parse(&name)
    }
}

impl From<&str> for LogicalType {
    fn from(name: &str) -> Self {
        LogicalType::parse(name)
    }
}

impl From<LogicalType> for String {
    fn from(t: LogicalType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
