//! Entity definitions.

use super::field::FieldSchema;
use super::relation::RelationSchema;
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// An entity definition: one primary table, its fields and outgoing relations.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct EntitySchema {
    /// Entity name (unique within the ontology).
    pub name: String,
    /// Plural/display name; falls back to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Primary table.
    pub table: String,
    /// Field definitions, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    /// Outgoing relations.
    #[serde(default)]
    pub relations: Vec<RelationSchema>,
}

impl EntitySchema {
    /// Create a new entity definition.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            table: table.into(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldSchema>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Add a relation.
    pub fn with_relation(mut self, relation: RelationSchema) -> Self {
        self.relations.push(relation);
        self
    }

    /// Display name of the entity.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a relation by name.
    pub fn get_relation(&self, name: &str) -> Option<&RelationSchema> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Fields with a database binding, in declaration order.
    pub fn bound_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.db.is_some())
    }

    /// Check whether a field is stored in this entity's primary table.
    pub fn owns_column(&self, field: &FieldSchema) -> bool {
        field.table() == Some(self.table.as_str())
    }

    /// The single primary-key field.
    pub fn primary_key_field(&self) -> Result<&FieldSchema, Error> {
        let keys: Vec<&FieldSchema> = self.fields.iter().filter(|f| f.is_primary_key()).collect();
        match keys.as_slice() {
            [key] => Ok(*key),
            _ => Err(Error::NoPrimaryKeyDefined {
                entity: self.name.clone(),
                found: keys.len(),
            }),
        }
    }
}
