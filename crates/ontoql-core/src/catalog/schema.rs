//! Schema bundle - versioned snapshot of the whole ontology.

use super::EntitySchema;
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

/// A versioned snapshot of the ontology.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct SchemaBundle {
    /// Schema version (monotonically increasing once stored in a catalog).
    #[serde(default)]
    pub version: u64,
    /// Creation timestamp (microseconds since Unix epoch).
    #[serde(default = "current_timestamp")]
    pub created_at: u64,
    /// Entity definitions keyed by name.
    #[serde(default)]
    pub entities: HashMap<String, EntitySchema>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            created_at: current_timestamp(),
            entities: HashMap::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntitySchema) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    /// List all entity names, sorted.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Parse and validate a bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let bundle: SchemaBundle = serde_json::from_str(json)?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Render the bundle as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize the schema bundle to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a schema bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Check that the bundle can be compiled against safely.
    ///
    /// Every table, column, field and relation name ends up verbatim in SQL
    /// text, so each one must be a plain identifier (tables may carry one
    /// schema qualifier). Relation targets and relation-proxy fields must
    /// point at existing definitions.
    pub fn validate(&self) -> Result<(), Error> {
        for (key, entity) in &self.entities {
            if *key != entity.name {
                return Err(invalid(
                    format!("entity registered under '{}'", key),
                    &entity.name,
                ));
            }
            check_identifier(&entity.name, "entity name", false)?;
            check_identifier(&entity.table, &format!("table of entity '{}'", entity.name), true)?;

            let mut names = HashSet::new();
            for field in &entity.fields {
                let context = format!("field of entity '{}'", entity.name);
                check_identifier(&field.name, &context, false)?;
                if !names.insert(field.name.as_str()) {
                    return Err(Error::DuplicateField {
                        entity: entity.name.clone(),
                        field: field.name.clone(),
                    });
                }

                if let Some(db) = &field.db {
                    let context = format!("binding of field '{}.{}'", entity.name, field.name);
                    check_identifier(&db.table, &context, true)?;
                    check_identifier(&db.column, &context, false)?;
                    if let Some(relation) = &db.relation_name {
                        if entity.get_relation(relation).is_none() {
                            return Err(Error::RelationNotFound {
                                entity: entity.name.clone(),
                                relation: relation.clone(),
                                path: field.name.clone(),
                            });
                        }
                    }
                }
            }

            let mut relation_names = HashSet::new();
            for relation in &entity.relations {
                let context = format!("relation of entity '{}'", entity.name);
                check_identifier(&relation.name, &context, false)?;
                if !relation_names.insert(relation.name.as_str()) {
                    return Err(invalid(
                        format!("duplicate relation of entity '{}'", entity.name),
                        &relation.name,
                    ));
                }

                let context = format!("relation '{}.{}'", entity.name, relation.name);
                check_identifier(&relation.source_table, &context, true)?;
                check_identifier(&relation.source_column, &context, false)?;
                check_identifier(&relation.target_table, &context, true)?;
                check_identifier(&relation.target_column, &context, false)?;

                if !self.entities.contains_key(&relation.target_entity) {
                    return Err(Error::EntityNotFound(relation.target_entity.clone()));
                }
            }
        }
        Ok(())
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Current time in microseconds since the Unix epoch.
pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

fn invalid(context: String, identifier: &str) -> Error {
    Error::InvalidIdentifier {
        context,
        identifier: identifier.to_string(),
    }
}

fn check_identifier(identifier: &str, context: &str, allow_qualified: bool) -> Result<(), Error> {
    let valid = if allow_qualified {
        let mut parts = identifier.splitn(2, '.');
        parts.all(is_plain_identifier)
    } else {
        is_plain_identifier(identifier)
    };

    if valid {
        Ok(())
    } else {
        Err(invalid(context.to_string(), identifier))
    }
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
