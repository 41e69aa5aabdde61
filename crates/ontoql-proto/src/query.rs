//! Filter trees and request types accepted by the query compiler.

use crate::error::Error;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Boolean operator combining the members of one filter node.
///
/// Anything other than an explicit `OR` (case-insensitive) reads as `AND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    /// All members must hold.
    #[default]
    And,
    /// At least one member must hold.
    Or,
}

impl LogicalOperator {
    /// SQL keyword for this operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl From<&str> for LogicalOperator {
    fn from(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("or") {
            LogicalOperator::Or
        } else {
            LogicalOperator::And
        }
    }
}

impl<'de> Deserialize<'de> for LogicalOperator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(LogicalOperator::from).unwrap_or_default())
    }
}

/// One comparison in a filter tree.
///
/// The operator stays a plain string here; the compiler decides which
/// operators it supports and rejects the rest with a field-qualified error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted field path, e.g. `orders.status`.
    pub field: String,
    /// Operator name, e.g. `equals` or `contains`.
    pub operator: String,
    /// Raw value; JSON numbers and booleans are accepted and stringified.
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: Option<String>,
}

impl Condition {
    /// Create a condition.
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: Option<impl Into<String>>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.map(Into::into),
        }
    }

    /// `field = value`.
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, "equals", Some(value))
    }

    /// `field != value`.
    pub fn not_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, "not_equals", Some(value))
    }

    /// Case-insensitive substring match.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, "contains", Some(value))
    }

    /// `field > value`.
    pub fn greater_than(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, "greater_than", Some(value))
    }

    /// `field < value`.
    pub fn less_than(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, "less_than", Some(value))
    }
}

/// A node of the recursive filter tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryNode {
    /// Operator joining conditions and groups of this node.
    pub operator: LogicalOperator,
    /// Conditions, compiled in order.
    pub conditions: Vec<Condition>,
    /// Nested groups, compiled after the conditions.
    pub groups: Vec<QueryNode>,
}

impl QueryNode {
    /// Create an empty AND node.
    pub fn and() -> Self {
        Self::default()
    }

    /// Create an empty OR node.
    pub fn or() -> Self {
        Self {
            operator: LogicalOperator::Or,
            ..Default::default()
        }
    }

    /// Add a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a nested group.
    pub fn with_group(mut self, group: QueryNode) -> Self {
        self.groups.push(group);
        self
    }

    /// Check if this node has neither conditions nor groups.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.groups.is_empty()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(Error::UnsupportedSortDirection(s.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Sort order for list queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field path to sort by.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    /// Ascending sort.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending sort.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Parameters of a paginated list query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListRequest {
    /// Field paths to project; empty selects every bound root field.
    pub fields: Vec<String>,
    /// Filter tree.
    pub filter: QueryNode,
    /// Zero-based page number.
    pub page: u32,
    /// Page size; `0` uses the compiler's default.
    pub page_size: u32,
    /// Optional sort.
    pub sort: Option<SortSpec>,
}

impl ListRequest {
    /// Create a request for the first page with default size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projected fields.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the filter tree.
    pub fn with_filter(mut self, filter: QueryNode) -> Self {
        self.filter = filter;
        self
    }

    /// Set page number and size.
    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Set the sort.
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// A field/value pair for inserts, updates and equality lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Field name on the root entity.
    pub field: String,
    /// Raw value; `None` binds NULL.
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: Option<String>,
}

impl FieldValue {
    /// Create a field-value pair.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: Some(value.into()),
        }
    }

    /// Create a field-value pair binding NULL.
    pub fn null(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: None,
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a scalar value, found {}",
            other
        ))),
    }
}
