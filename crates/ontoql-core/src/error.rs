//! Core error types.

use thiserror::Error;

/// Core errors.
///
/// Everything from [`Error::EntityNotFound`] down to
/// [`Error::InvalidIdentifier`] describes bad input or bad metadata and is
/// reported to the caller as a client error; compilation never continues
/// past one of them.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ontoql_proto::Error),

    /// JSON encoding or decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Database execution error.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Result column of a type the executor cannot decode.
    #[cfg(feature = "postgres")]
    #[error("cannot decode column '{column}' of type {type_name}")]
    UnsupportedColumnType { column: String, type_name: String },

    /// Unknown entity.
    #[error("entity '{0}' not found")]
    EntityNotFound(String),

    /// A relation referenced by a relation-proxy field does not exist.
    #[error("relation '{relation}' not found on entity '{entity}' (path '{path}')")]
    RelationNotFound {
        entity: String,
        relation: String,
        path: String,
    },

    /// A path segment is neither a field nor a relation, a scalar field has
    /// trailing segments, or the path ends on a relation.
    #[error("cannot resolve field path '{path}' at '{segment}': {reason}")]
    FieldPathUnresolvable {
        path: String,
        segment: String,
        reason: String,
    },

    /// Unknown condition operator.
    #[error("unsupported operator '{operator}' on field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    /// A raw value could not be converted to the field's logical type.
    #[error(
        "invalid value '{value}' for field type {logical_type}{}",
        .field.as_ref().map(|f| format!(" (field '{}')", f)).unwrap_or_default()
    )]
    InvalidValueForType {
        value: String,
        logical_type: String,
        field: Option<String>,
    },

    /// The entity does not declare exactly one primary-key field.
    #[error("entity '{entity}' must declare exactly one primary-key field, found {found}")]
    NoPrimaryKeyDefined { entity: String, found: usize },

    /// Insert or update touching a column outside the entity's primary table.
    #[error("field '{field}' of entity '{entity}' belongs to table '{table}', not the primary table")]
    ForeignTableFieldRejected {
        entity: String,
        field: String,
        table: String,
    },

    /// Update without any field to set.
    #[error("no updatable fields supplied for entity '{0}'")]
    NoUpdatableFieldsSupplied(String),

    /// Update trying to change the primary key.
    #[error("primary-key field '{field}' of entity '{entity}' cannot be updated")]
    PrimaryKeyImmutable { entity: String, field: String },

    /// Neither the sort path nor a root field of that name could be used.
    #[error("cannot sort by '{path}': {reason}")]
    SortFieldUnresolvable { path: String, reason: String },

    /// The same field supplied twice in one insert, update or lookup.
    #[error("field '{field}' of entity '{entity}' supplied more than once")]
    DuplicateField { entity: String, field: String },

    /// Metadata identifier unusable as SQL text.
    #[error("invalid identifier '{identifier}' in {context}")]
    InvalidIdentifier { context: String, identifier: String },
}

impl Error {
    /// Build a [`Error::FieldPathUnresolvable`].
    pub fn unresolvable(
        path: impl Into<String>,
        segment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::FieldPathUnresolvable {
            path: path.into(),
            segment: segment.into(),
            reason: reason.into(),
        }
    }

    /// Attach a field path to a value-typing error.
    pub fn for_field(self, path: &str) -> Self {
        match self {
            Error::InvalidValueForType {
                value,
                logical_type,
                field: None,
            } => Error::InvalidValueForType {
                value,
                logical_type,
                field: Some(path.to_string()),
            },
            other => other,
        }
    }

    /// Check whether this error was caused by the request or the ontology
    /// rather than by infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_)
                | Error::EntityNotFound(_)
                | Error::RelationNotFound { .. }
                | Error::FieldPathUnresolvable { .. }
                | Error::UnsupportedOperator { .. }
                | Error::InvalidValueForType { .. }
                | Error::NoPrimaryKeyDefined { .. }
                | Error::ForeignTableFieldRejected { .. }
                | Error::NoUpdatableFieldsSupplied(_)
                | Error::PrimaryKeyImmutable { .. }
                | Error::SortFieldUnresolvable { .. }
                | Error::DuplicateField { .. }
                | Error::InvalidIdentifier { .. }
        )
    }
}
