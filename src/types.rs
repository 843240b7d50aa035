// Error types shared by the storage layer

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),
}

impl StorageError {
    /// Whether a caller-side retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::TransientIo(_) | StorageError::DeadlineExceeded(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
