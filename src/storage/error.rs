//! Storage layer errors.

use super::page::PageId;

/// Errors from the storage backends and the file manager.
#[derive(Debug)]
pub enum StorageError {
    /// The page has not been allocated in this file.
    PageNotFound(PageId),
    /// A read/write buffer was not exactly one page long.
    InvalidBufferSize {
        /// Required buffer size (the page size).
        expected: usize,
        /// Size of the buffer that was passed in.
        actual: usize,
    },
    /// A heap-file name the file manager cannot accept.
    InvalidName(String),
    /// The backing file has an impossible shape (e.g. a size that is not a
    /// whole number of pages).
    Corrupted(String),
    /// I/O error from the file system.
    Io(std::io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::PageNotFound(id) => write!(f, "{} not found", id),
            StorageError::InvalidBufferSize { expected, actual } => {
                write!(f, "buffer must be {} bytes, got {}", expected, actual)
            }
            StorageError::InvalidName(name) => write!(f, "invalid file name {:?}", name),
            StorageError::Corrupted(msg) => write!(f, "corrupted storage: {}", msg),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}
