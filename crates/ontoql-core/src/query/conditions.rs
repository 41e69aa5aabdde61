//! Filter tree compilation.

use super::context::QueryContext;
use super::resolver::PathResolver;
use super::typing::{convert, NULL_LITERAL};
use crate::catalog::OntologyAccessor;
use crate::error::Error;
use ontoql_proto::{Condition, QueryNode, Value};
use std::fmt;
use std::str::FromStr;

/// Operators accepted in filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    IsNull,
    IsNotNull,
}

impl ConditionOperator {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::Contains => "contains",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::GreaterThanOrEqual => "greater_than_or_equal",
            ConditionOperator::LessThanOrEqual => "less_than_or_equal",
            ConditionOperator::IsNull => "is_null",
            ConditionOperator::IsNotNull => "is_not_null",
        }
    }

    /// SQL operator keyword or symbol.
    pub fn sql_operator(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "=",
            ConditionOperator::NotEquals => "!=",
            ConditionOperator::Contains => "ILIKE",
            ConditionOperator::GreaterThan => ">",
            ConditionOperator::LessThan => "<",
            ConditionOperator::GreaterThanOrEqual => ">=",
            ConditionOperator::LessThanOrEqual => "<=",
            ConditionOperator::IsNull => "IS NULL",
            ConditionOperator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Check whether the operator compares against a bound value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, ConditionOperator::IsNull | ConditionOperator::IsNotNull)
    }
}

impl FromStr for ConditionOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(ConditionOperator::Equals),
            "not_equals" => Ok(ConditionOperator::NotEquals),
            "contains" => Ok(ConditionOperator::Contains),
            "greater_than" => Ok(ConditionOperator::GreaterThan),
            "less_than" => Ok(ConditionOperator::LessThan),
            "greater_than_or_equal" => Ok(ConditionOperator::GreaterThanOrEqual),
            "less_than_or_equal" => Ok(ConditionOperator::LessThanOrEqual),
            "is_null" => Ok(ConditionOperator::IsNull),
            "is_not_null" => Ok(ConditionOperator::IsNotNull),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiles filter trees into parenthesized boolean SQL.
pub struct ConditionCompiler<'a, A: OntologyAccessor + ?Sized> {
    resolver: PathResolver<'a, A>,
}

impl<'a, A: OntologyAccessor + ?Sized> ConditionCompiler<'a, A> {
    /// Create a compiler reading schemas from `accessor`.
    pub fn new(accessor: &'a A) -> Self {
        Self {
            resolver: PathResolver::new(accessor),
        }
    }

    /// Compile a node and its groups.
    ///
    /// Conditions come first, then groups; the fragments are joined with the
    /// node's operator and wrapped in one pair of parentheses. A node with
    /// nothing to contribute yields an empty string.
    pub fn compile(&self, node: &QueryNode, ctx: &mut QueryContext) -> Result<String, Error> {
        let mut fragments = Vec::with_capacity(node.conditions.len() + node.groups.len());

        for condition in &node.conditions {
            let fragment = self
                .compile_condition(condition, ctx)
                .map_err(|e| e.for_field(&condition.field))?;
            fragments.push(fragment);
        }

        for group in &node.groups {
            let fragment = self.compile(group, ctx)?;
            if !fragment.is_empty() {
                fragments.push(fragment);
            }
        }

        if fragments.is_empty() {
            return Ok(String::new());
        }

        let separator = format!(" {} ", node.operator.as_sql());
        Ok(format!("({})", fragments.join(&separator)))
    }

    fn compile_condition(
        &self,
        condition: &Condition,
        ctx: &mut QueryContext,
    ) -> Result<String, Error> {
        let operator: ConditionOperator = condition.operator.parse().map_err(|operator| {
            Error::UnsupportedOperator {
                field: condition.field.clone(),
                operator,
            }
        })?;

        let resolved = self.resolver.resolve(&condition.field, ctx)?;
        let column = resolved.info.qualified_column();

        if !operator.takes_value() {
            return Ok(format!("{} {}", column, operator.sql_operator()));
        }

        let raw = condition.value.as_deref();
        let param = ctx.next_param_name(&resolved.info.column_alias);

        // `contains` matches the textual form of any column, so the raw value
        // is bound as-is instead of its typed conversion.
        if operator == ConditionOperator::Contains {
            let raw = raw.ok_or_else(|| Error::InvalidValueForType {
                value: NULL_LITERAL.to_string(),
                logical_type: resolved.logical_type.to_string(),
                field: None,
            })?;
            ctx.bind(param.clone(), Value::String(format!("%{}%", raw)));
            return Ok(format!(
                "CAST({} AS TEXT) {} :{}",
                column,
                operator.sql_operator(),
                param
            ));
        }

        let typed = convert(raw, &resolved.logical_type)?;
        ctx.bind(param.clone(), typed);
        Ok(format!("{} {} :{}", column, operator.sql_operator(), param))
    }
}
