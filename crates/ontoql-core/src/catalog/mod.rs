//! Ontology catalog.
//!
//! Entities, their fields and relations, versioned bundles of them and the
//! accessor the query compiler reads schemas through.

mod accessor;
mod catalog;
mod entity;
mod field;
mod relation;
mod schema;
mod types;

pub use accessor::OntologyAccessor;
pub use catalog::Catalog;
pub use entity::EntitySchema;
pub use field::{DbBinding, FieldKind, FieldSchema};
pub use relation::{RelationSchema, ALIAS_PLACEHOLDER};
pub use schema::SchemaBundle;
pub use types::LogicalType;
