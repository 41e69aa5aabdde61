//! Field definitions for entities.

use super::types::LogicalType;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Where a field lives in the database.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct DbBinding {
    /// Table holding the column.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Whether the column is the entity's primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Relation traversed to reach the column, for relation-proxy fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
}

/// A field definition within an entity.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct FieldSchema {
    /// Field name.
    pub name: String,
    /// Logical type.
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
    /// Database binding; unbound fields cannot be queried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<DbBinding>,
}

/// How a field participates in query compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind<'a> {
    /// No database binding.
    Unbound,
    /// A column of the owning entity's table.
    Column(&'a DbBinding),
    /// A column reached through `relation`; resolving the field follows that
    /// relation to the target field bound to the same column.
    RelationProxy {
        binding: &'a DbBinding,
        relation: &'a str,
    },
}

impl FieldSchema {
    /// Create an unbound field.
    pub fn new(name: impl Into<String>, logical_type: impl Into<LogicalType>) -> Self {
        Self {
            name: name.into(),
            logical_type: logical_type.into(),
            db: None,
        }
    }

    /// Bind the field to a table column.
    pub fn with_column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.db = Some(DbBinding {
            table: table.into(),
            column: column.into(),
            primary_key: false,
            relation_name: None,
        });
        self
    }

    /// Mark the bound column as primary key.
    pub fn primary_key(mut self) -> Self {
        if let Some(db) = self.db.as_mut() {
            db.primary_key = true;
        }
        self
    }

    /// Mark the bound column as reached through a relation.
    pub fn via_relation(mut self, relation: impl Into<String>) -> Self {
        if let Some(db) = self.db.as_mut() {
            db.relation_name = Some(relation.into());
        }
        self
    }

    /// Classify the field.
    pub fn kind(&self) -> FieldKind<'_> {
        match &self.db {
            None => FieldKind::Unbound,
            Some(binding) => match binding.relation_name.as_deref() {
                Some(relation) => FieldKind::RelationProxy { binding, relation },
                None => FieldKind::Column(binding),
            },
        }
    }

    /// Bound column name.
    pub fn column(&self) -> Option<&str> {
        self.db.as_ref().map(|db| db.column.as_str())
    }

    /// Bound table name.
    pub fn table(&self) -> Option<&str> {
        self.db.as_ref().map(|db| db.table.as_str())
    }

    /// Check if this field is bound to a primary-key column.
    pub fn is_primary_key(&self) -> bool {
        self.db.as_ref().is_some_and(|db| db.primary_key)
    }
}
