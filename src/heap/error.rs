//! Error types for the heap module.

use super::page::{Rid, SlotId};
use crate::storage::{BufferPoolError, StorageError};

/// Errors from single-page record operations.
#[derive(Debug)]
pub enum HeapError {
    /// Not enough contiguous free space for the record and its slot.
    PageFull {
        /// Bytes needed for the record plus slot overhead.
        required: usize,
        /// Bytes available on the page.
        available: usize,
    },
    /// The slot does not exist or holds a deleted record.
    SlotNotFound(SlotId),
}

impl std::fmt::Display for HeapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeapError::PageFull {
                required,
                available,
            } => write!(f, "page full: need {} bytes, have {}", required, available),
            HeapError::SlotNotFound(slot_id) => {
                write!(f, "slot {} not found or deleted", slot_id)
            }
        }
    }
}

impl std::error::Error for HeapError {}

/// Errors from heap-file operations.
#[derive(Debug)]
pub enum HeapFileError {
    /// The file name is empty, too long, or contains reserved characters.
    InvalidName(String),
    /// A heap file with this name already exists.
    FileExists(String),
    /// The record can never fit on a data page.
    RecordTooLarge {
        /// Size of the rejected record.
        size: usize,
        /// Largest record a page can hold.
        max: usize,
    },
    /// Scan parameters failed validation.
    BadScanParam(&'static str),
    /// The record id does not name a data page of this file.
    InvalidRid(Rid),
    /// The handle has no pinned data page (the scan was ended).
    NoCurrentPage,
    /// The cursor has no current record.
    NoCurrentRecord,
    /// `reset_scan` was called before any `mark_scan`.
    ScanNotMarked,
    /// The file header does not describe a plausible heap file.
    Corrupt(String),
    /// A page-level operation failed.
    Page(HeapError),
    /// The buffer pool failed underneath the heap file.
    Buffer(BufferPoolError),
    /// The storage layer failed underneath the heap file.
    Storage(StorageError),
}

impl std::fmt::Display for HeapFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeapFileError::InvalidName(name) => write!(f, "invalid heap file name {:?}", name),
            HeapFileError::FileExists(name) => {
                write!(f, "heap file {:?} already exists", name)
            }
            HeapFileError::RecordTooLarge { size, max } => {
                write!(f, "record of {} bytes exceeds page capacity of {}", size, max)
            }
            HeapFileError::BadScanParam(reason) => write!(f, "bad scan parameter: {}", reason),
            HeapFileError::InvalidRid(rid) => write!(f, "invalid record id {}", rid),
            HeapFileError::NoCurrentPage => write!(f, "no data page is pinned"),
            HeapFileError::NoCurrentRecord => write!(f, "scan has no current record"),
            HeapFileError::ScanNotMarked => write!(f, "reset_scan without a prior mark_scan"),
            HeapFileError::Corrupt(msg) => write!(f, "corrupt heap file: {}", msg),
            HeapFileError::Page(e) => write!(f, "page error: {}", e),
            HeapFileError::Buffer(e) => write!(f, "buffer pool error: {}", e),
            HeapFileError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for HeapFileError {}

impl From<HeapError> for HeapFileError {
    fn from(e: HeapError) -> Self {
        HeapFileError::Page(e)
    }
}

impl From<BufferPoolError> for HeapFileError {
    fn from(e: BufferPoolError) -> Self {
        HeapFileError::Buffer(e)
    }
}

impl From<StorageError> for HeapFileError {
    fn from(e: StorageError) -> Self {
        HeapFileError::Storage(e)
    }
}
