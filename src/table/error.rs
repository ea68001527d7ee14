//! Table error types

use crate::engine::EngineError;
use crate::form_data::FormDataError;
use crate::query::QueryError;
use thiserror::Error;

/// Errors surfaced by the table controller
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Query build error: {0}")]
    Query(#[from] QueryError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Form data error: {0}")]
    FormData(#[from] FormDataError),

    /// The engine returned a different number of result sets than queries dispatched
    #[error("Expected {expected} result sets, got {actual}")]
    ResultMismatch { expected: usize, actual: usize },
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;
