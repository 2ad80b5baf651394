//! Service error type.

use tarmed_loader::PackagerError;
use thiserror::Error;

/// Errors surfaced by the packaging service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Error from the packaging core.
    #[error(transparent)]
    Packager(#[from] PackagerError),

    /// The core task has stopped and no longer answers requests.
    #[error("Packaging core is not running")]
    CoreGone,

    /// A background load or export panicked or was cancelled.
    #[error("Background worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
