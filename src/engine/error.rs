//! Engine error types

use thiserror::Error;

/// Errors that can occur while executing a query object
#[derive(Error, Debug)]
pub enum EngineError {
    /// Metric kind the engine cannot evaluate
    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),

    /// Post-processing operation the engine cannot apply
    #[error("Unsupported post-processing operation: {0}")]
    UnsupportedOperation(String),

    /// Filter the engine cannot evaluate (e.g. raw SQL fragments)
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Dataset could not be loaded
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Remote or backend failure
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::UnsupportedOperation("compare".to_string());
        assert_eq!(err.to_string(), "Unsupported post-processing operation: compare");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EngineError = io_err.into();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
