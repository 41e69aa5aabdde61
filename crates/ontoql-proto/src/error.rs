//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding requests or reshaping results.
#[derive(Debug, Error)]
pub enum Error {
    /// Sort direction other than `asc` or `desc`.
    #[error("unsupported sort direction '{0}', expected 'asc' or 'desc'")]
    UnsupportedSortDirection(String),

    /// A placeholder in the SQL text has no bound value.
    #[error("parameter ':{0}' is referenced by the statement but not bound")]
    UnboundParameter(String),
}
