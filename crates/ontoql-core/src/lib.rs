//! ontoql core - ontology catalog and dynamic SQL query compilation.
//!
//! The [`catalog`] describes entities, their columns and relations; the
//! [`query`] compiler turns field paths and filter trees over those entities
//! into parameterized SQL. With the `postgres` feature the compiled
//! statements can be run through [`postgres::PgExecutor`].
//!
//! ```
//! use ontoql_core::catalog::{EntitySchema, FieldSchema, LogicalType, SchemaBundle};
//! use ontoql_core::proto::{Condition, ListRequest, QueryNode};
//! use ontoql_core::QueryBuilder;
//!
//! let ontology = SchemaBundle::new(1).with_entity(
//!     EntitySchema::new("Customer", "customers")
//!         .with_field(
//!             FieldSchema::new("id", LogicalType::Uuid)
//!                 .with_column("customers", "id")
//!                 .primary_key(),
//!         )
//!         .with_field(
//!             FieldSchema::new("inn", LogicalType::String)
//!                 .with_column("customers", "inn"),
//!         ),
//! );
//!
//! let request = ListRequest::new()
//!     .with_fields(["inn"])
//!     .with_filter(QueryNode::and().with_condition(Condition::contains("inn", "77")));
//! let result = QueryBuilder::new(&ontology)
//!     .build_list("Customer", &request)
//!     .unwrap();
//!
//! assert_eq!(
//!     result.sql,
//!     "SELECT t0.inn AS inn FROM customers t0 \
//!      WHERE (CAST(t0.inn AS TEXT) ILIKE :param_inn_1) LIMIT 20 OFFSET 0"
//! );
//! ```

pub mod catalog;
pub mod error;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;

pub use catalog::{
    Catalog, DbBinding, EntitySchema, FieldKind, FieldSchema, LogicalType, OntologyAccessor,
    RelationSchema, SchemaBundle,
};
pub use error::Error;
pub use query::{CompilerConfig, QueryBuilder, ID_PARAM};

#[cfg(feature = "postgres")]
pub use postgres::{PgExecutor, Record};

/// Re-export protocol types.
pub use ontoql_proto as proto;
