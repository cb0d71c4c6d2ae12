//! Export errors.

use thiserror::Error;

/// Export error types.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Result item is neither a record nor a collection.
    #[error("invalid data type: {0}")]
    InvalidDataType(String),

    /// Record headers and values are not aligned.
    #[error("record has {headers} headers but {values} values")]
    RowLength { headers: usize, values: usize },

    /// CSV encoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
