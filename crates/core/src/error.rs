//! Core error types for the Reseed domain

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReseedError {
    #[error("Validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    #[error("Precondition not met: {reason}")]
    PreconditionUnmet { reason: String },

    #[error("External service error: {service} - {error}")]
    ExternalServiceError { service: String, error: String },

    #[error("Timeout after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Rate limited by indexer {indexer_id}, retry after {retry_after_secs}s")]
    RateLimited {
        indexer_id: i32,
        retry_after_secs: u64,
    },

    #[error("Data integrity error: {detail}")]
    IntegrityError { detail: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("File system error: {path} - {error}")]
    FileSystemError { path: String, error: String },

    #[error("Infrastructure error: {component} - {message}")]
    InfrastructureError { component: String, message: String },

    #[error("Canceled: {operation}")]
    Canceled { operation: String },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last_error: Box<ReseedError>,
    },
}

impl ReseedError {
    /// Whether a retry of the same operation could plausibly succeed.
    ///
    /// Rate limits are excluded on purpose: they are handled by the
    /// persisted cooldown registry, not by inline retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReseedError::ExternalServiceError { .. }
                | ReseedError::Timeout { .. }
                | ReseedError::StorageError { .. }
                | ReseedError::FileSystemError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReseedError>;
