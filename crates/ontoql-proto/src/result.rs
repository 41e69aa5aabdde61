//! Compiled statements handed back to callers.

use crate::error::Error;
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// A resolved, queryable reference to one column of the projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    /// Display (plural) name of the entity owning the column.
    pub entity: String,
    /// Field name on that entity.
    pub field: String,
    /// Full dotted path as requested.
    pub full_path: String,
    /// Table alias the column is read from.
    pub table_alias: String,
    /// Column name.
    pub column: String,
    /// Output column alias, the full path with `.` replaced by `_`.
    pub column_alias: String,
}

impl FieldInfo {
    /// Qualified column reference, `alias.column`.
    pub fn qualified_column(&self) -> String {
        format!("{}.{}", self.table_alias, self.column)
    }
}

/// Named statement parameters in binding order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    entries: Vec<(String, Value)>,
}

impl Parameters {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, replacing an earlier binding of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Get a bound value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Check whether a name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Output of the compiler: SQL text with `:name` placeholders, the bound
/// parameters and the projected fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QueryResult {
    /// SQL text.
    pub sql: String,
    /// Bound parameters.
    pub params: Parameters,
    /// Projected fields; empty for count, existence and DML statements.
    pub fields: Vec<FieldInfo>,
}

impl QueryResult {
    /// Create a result.
    pub fn new(sql: impl Into<String>, params: Parameters, fields: Vec<FieldInfo>) -> Self {
        Self {
            sql: sql.into(),
            params,
            fields,
        }
    }

    /// Bind a caller-supplied parameter, such as `id_param` for updates and deletes.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value.into());
        self
    }

    /// Rewrite `:name` placeholders into `$1..$n` for drivers without named
    /// parameters.
    ///
    /// Indexes follow first appearance in the SQL text; a name used twice
    /// reuses its index. `::` casts and quoted literals are left untouched.
    pub fn to_positional(&self) -> Result<(String, Vec<Value>), Error> {
        let mut sql = String::with_capacity(self.sql.len());
        let mut values = Vec::new();
        let mut indexes: HashMap<String, usize> = HashMap::new();

        let chars: Vec<char> = self.sql.chars().collect();
        let mut i = 0;
        let mut in_literal = false;

        while i < chars.len() {
            let c = chars[i];

            if c == '\'' {
                in_literal = !in_literal;
                sql.push(c);
                i += 1;
                continue;
            }

            let starts_placeholder = !in_literal
                && c == ':'
                && chars.get(i + 1).is_some_and(|n| is_ident_start(*n))
                && (i == 0 || chars[i - 1] != ':');

            if !starts_placeholder {
                sql.push(c);
                i += 1;
                continue;
            }

            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_ident_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();

            let index = match indexes.get(&name) {
                Some(index) => *index,
                None => {
                    let value = self
                        .params
                        .get(&name)
                        .ok_or_else(|| Error::UnboundParameter(name.clone()))?;
                    values.push(value.clone());
                    indexes.insert(name, values.len());
                    values.len()
                }
            };

            sql.push('$');
            sql.push_str(&index.to_string());
            i = end;
        }

        Ok((sql, values))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
