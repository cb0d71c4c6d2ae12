//! Job errors.

use thiserror::Error;

use crate::job::ValidationError;

/// Job error types.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job or job data failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Identifier cannot be used as a file name.
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    /// Job row not found.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Exported artifact not found. The job row may still exist.
    #[error("Artifact not found for job: {0}")]
    ArtifactNotFound(String),

    /// Store is temporarily locked by another writer.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Caller cancelled while the operation was in progress.
    #[error("Operation {operation} cancelled")]
    Cancelled { operation: String },

    /// Store stayed busy for every attempt.
    #[error("Operation {operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<JobError>,
    },

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Result export failed.
    #[error("Export error: {0}")]
    Export(#[from] scrapejobs_export::ExportError),

    /// Job execution failed.
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_retries_exhausted_names_operation_and_source() {
        let err = JobError::RetriesExhausted {
            operation: "Update".to_string(),
            attempts: 10,
            source: Box::new(JobError::Busy("database is locked".to_string())),
        };

        let msg = err.to_string();
        assert!(msg.contains("Update"));
        assert!(msg.contains("10 attempts"));
        assert!(err.source().unwrap().to_string().contains("database is locked"));
    }

    #[test]
    fn test_not_found_variants_are_distinct() {
        let row = JobError::NotFound("abc".to_string());
        let artifact = JobError::ArtifactNotFound("abc".to_string());
        assert!(matches!(row, JobError::NotFound(_)));
        assert!(matches!(artifact, JobError::ArtifactNotFound(_)));
        assert_ne!(row.to_string(), artifact.to_string());
    }
}
