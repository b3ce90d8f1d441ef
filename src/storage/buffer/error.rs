//! Buffer pool errors.

use crate::storage::error::StorageError;

/// Errors from the buffer pool.
#[derive(Debug)]
pub enum BufferPoolError {
    /// Every frame is occupied and pinned; nothing can be evicted.
    NoFreeFrames,
    /// The storage backend failed underneath the pool.
    Storage(StorageError),
}

impl std::fmt::Display for BufferPoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferPoolError::NoFreeFrames => write!(f, "all buffer frames are pinned"),
            BufferPoolError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for BufferPoolError {}

impl From<StorageError> for BufferPoolError {
    fn from(e: StorageError) -> Self {
        BufferPoolError::Storage(e)
    }
}
