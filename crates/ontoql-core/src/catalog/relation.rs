//! Relation definitions between entities.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Token in [`RelationSchema::join_condition`] replaced by the alias
/// generated for the joined table.
pub const ALIAS_PLACEHOLDER: &str = "{alias}";

/// An edge from an owning entity to a target entity.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct RelationSchema {
    /// Relation name (unique within the owning entity).
    pub name: String,
    /// Target entity name.
    pub target_entity: String,
    /// Table on the owning side.
    pub source_table: String,
    /// Join column on the owning side.
    pub source_column: String,
    /// Table of the target entity.
    pub target_table: String,
    /// Join column on the target side.
    pub target_column: String,
    /// Extra predicate appended to the ON clause, e.g. `{alias}.deleted = false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_condition: Option<String>,
}

impl RelationSchema {
    /// Create a relation joining `source_table.source_column` to
    /// `target_table.target_column`.
    pub fn new(
        name: impl Into<String>,
        target_entity: impl Into<String>,
        source: (&str, &str),
        target: (&str, &str),
    ) -> Self {
        Self {
            name: name.into(),
            target_entity: target_entity.into(),
            source_table: source.0.to_string(),
            source_column: source.1.to_string(),
            target_table: target.0.to_string(),
            target_column: target.1.to_string(),
            join_condition: None,
        }
    }

    /// Set the extra join predicate.
    pub fn with_join_condition(mut self, condition: impl Into<String>) -> Self {
        self.join_condition = Some(condition.into());
        self
    }

    /// Extra join predicate with the alias placeholder substituted.
    pub fn join_condition_for(&self, alias: &str) -> Option<String> {
        self.join_condition
            .as_deref()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| c.replace(ALIAS_PLACEHOLDER, alias))
    }
}
