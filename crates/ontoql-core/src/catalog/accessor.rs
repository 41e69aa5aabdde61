//! Read access to entity schemas.

use super::{EntitySchema, SchemaBundle};
use crate::error::Error;
use std::sync::Arc;

/// Source of entity schemas for the query compiler.
///
/// Implementations must be safe to share between threads; every compilation
/// borrows the accessor immutably.
pub trait OntologyAccessor: Send + Sync {
    /// Look up an entity schema by name.
    ///
    /// Returns [`Error::EntityNotFound`] for unknown names.
    fn entity_schema(&self, name: &str) -> Result<EntitySchema, Error>;
}

impl OntologyAccessor for SchemaBundle {
    fn entity_schema(&self, name: &str) -> Result<EntitySchema, Error> {
        self.get_entity(name)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound(name.to_string()))
    }
}

impl<T: OntologyAccessor + ?Sized> OntologyAccessor for Arc<T> {
    fn entity_schema(&self, name: &str) -> Result<EntitySchema, Error> {
        (**self).entity_schema(name)
    }
}

impl<T: OntologyAccessor + ?Sized> OntologyAccessor for &T {
    fn entity_schema(&self, name: &str) -> Result<EntitySchema, Error> {
        (**self).entity_schema(name)
    }
}
