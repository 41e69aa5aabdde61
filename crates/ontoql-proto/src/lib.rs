//! ontoql protocol types.
//!
//! This crate defines the values exchanged between callers and the query
//! compiler in `ontoql-core`.
//!
//! # Modules
//!
//! - [`value`] - Typed values bound to statement parameters
//! - [`query`] - Filter trees, sort and list requests, field/value pairs
//! - [`result`] - Compiled statements and projected field descriptors
//! - [`error`] - Protocol error types
//!
//! Every request type derives `serde::Deserialize`, so filter trees can be
//! read straight from JSON:
//!
//! ```
//! use ontoql_proto::{LogicalOperator, QueryNode};
//!
//! let node: QueryNode = serde_json::from_str(
//!     r#"{"operator": "OR", "conditions": [{"field": "inn", "operator": "contains", "value": "77"}]}"#,
//! ).unwrap();
//! assert_eq!(node.operator, LogicalOperator::Or);
//! ```

pub mod error;
pub mod query;
pub mod result;
pub mod value;

pub use error::Error;

pub use query::{
    Condition, FieldValue, ListRequest, LogicalOperator, QueryNode, SortDirection, SortSpec,
};
pub use result::{FieldInfo, Parameters, QueryResult};
pub use value::{Value, ValueKind};
