//! Query error types
//!
//! Errors raised while composing queries from a chart configuration.

use thiserror::Error;

/// Errors that can occur while building queries
#[derive(Error, Debug)]
pub enum QueryError {
    /// A serialized raw-mode ordering entry could not be parsed
    #[error("Malformed order-by entry {entry:?}: {reason}")]
    MalformedOrderBy { entry: String, reason: String },
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
