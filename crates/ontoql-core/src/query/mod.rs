//! Dynamic query compiler.
//!
//! [`QueryBuilder`] turns an entity name, requested field paths and a filter
//! tree into parameterized SQL. Each statement is compiled in its own
//! [`QueryContext`]: the [`PathResolver`] walks field paths across relations
//! and registers joins, the [`ConditionCompiler`] renders the filter tree and
//! binds typed values, and the [`SqlAssembler`] renders the final text.

mod assembler;
mod builder;
mod conditions;
mod config;
mod context;
mod resolver;
mod typing;

pub use assembler::SqlAssembler;
pub use builder::{QueryBuilder, ID_PARAM};
pub use conditions::{ConditionCompiler, ConditionOperator};
pub use config::{
    CompilerConfig, DEFAULT_ALIAS_PREFIX, DEFAULT_MAX_PATH_STEPS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use context::{Join, QueryContext};
pub use resolver::{PathResolver, Resolved};
pub use typing::{convert, NULL_LITERAL};
