//! Per-compilation state.

use super::config::CompilerConfig;
use crate::catalog::EntitySchema;
use ontoql_proto::{FieldInfo, Parameters, QueryResult, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A LEFT JOIN registered while resolving paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Dot-joined relation names leading to the joined table.
    pub path_key: String,
    /// Alias of the joined table.
    pub alias: String,
    /// Rendered `LEFT JOIN ...` clause.
    pub sql: String,
}

/// Mutable accumulator threaded through the compilation of one statement.
///
/// Every alias is unique and every join path maps to exactly one alias for
/// the life of the context. A context is never reused across statements.
#[derive(Debug)]
pub struct QueryContext {
    root: Arc<EntitySchema>,
    root_alias: String,
    alias_prefix: String,
    alias_counter: usize,
    param_counter: usize,
    max_path_steps: usize,
    joins: Vec<Join>,
    join_aliases: HashMap<String, String>,
    fields: Vec<FieldInfo>,
    where_clauses: Vec<String>,
    params: Parameters,
}

impl QueryContext {
    /// Create a context rooted at `root`, aliased `<prefix>0`.
    pub fn new(root: EntitySchema, config: &CompilerConfig) -> Self {
        Self {
            root: Arc::new(root),
            root_alias: format!("{}0", config.alias_prefix),
            alias_prefix: config.alias_prefix.clone(),
            alias_counter: 0,
            param_counter: 0,
            max_path_steps: config.max_path_steps,
            joins: Vec::new(),
            join_aliases: HashMap::new(),
            fields: Vec::new(),
            where_clauses: Vec::new(),
            params: Parameters::new(),
        }
    }

    /// Root entity schema.
    pub fn root(&self) -> &Arc<EntitySchema> {
        &self.root
    }

    /// Alias of the root table.
    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    /// Resolution step ceiling for one path.
    pub fn max_path_steps(&self) -> usize {
        self.max_path_steps
    }

    /// Allocate a fresh table alias.
    pub fn next_alias(&mut self) -> String {
        self.alias_counter += 1;
        format!("{}{}", self.alias_prefix, self.alias_counter)
    }

    /// Allocate a fresh parameter name for a column alias.
    pub fn next_param_name(&mut self, column_alias: &str) -> String {
        self.param_counter += 1;
        format!("param_{}_{}", column_alias, self.param_counter)
    }

    /// Bind a parameter value.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.params.insert(name, value);
    }

    /// Alias already registered for a join path.
    pub fn join_alias(&self, path_key: &str) -> Option<&str> {
        self.join_aliases.get(path_key).map(String::as_str)
    }

    /// Record a join. The first registration of a path wins.
    pub fn register_join(&mut self, path_key: String, alias: String, sql: String) {
        if self.join_aliases.contains_key(&path_key) {
            return;
        }
        self.join_aliases.insert(path_key.clone(), alias.clone());
        self.joins.push(Join {
            path_key,
            alias,
            sql,
        });
    }

    /// Joins in registration order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Check whether any join was registered.
    pub fn has_joins(&self) -> bool {
        !self.joins.is_empty()
    }

    /// Add a projected field. Returns `false` when its path is already projected.
    pub fn add_field(&mut self, info: FieldInfo) -> bool {
        if self.fields.iter().any(|f| f.full_path == info.full_path) {
            return false;
        }
        self.fields.push(info);
        true
    }

    /// Projected fields in order.
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Append a WHERE fragment; empty fragments are ignored.
    pub fn push_where(&mut self, fragment: String) {
        if !fragment.is_empty() {
            self.where_clauses.push(fragment);
        }
    }

    /// WHERE fragments in order.
    pub fn where_clauses(&self) -> &[String] {
        &self.where_clauses
    }

    /// Bound parameters.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Consume the context into a [`QueryResult`].
    pub fn finish(self, sql: String, with_fields: bool) -> QueryResult {
        let fields = if with_fields { self.fields } else { Vec::new() };
        QueryResult::new(sql, self.params, fields)
    }
}
