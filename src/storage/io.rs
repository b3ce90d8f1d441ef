//! Page I/O backends.
//!
//! The [`Storage`] trait is the lowest layer of the crate: it reads and
//! writes raw 8KB pages against caller-owned buffers and knows nothing
//! about what the bytes mean. Caching and pinning live above it in the
//! buffer pool; page formats live above that in the heap module.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use super::error::StorageError;
use super::page::PageId;

/// Page-granular I/O backend.
///
/// Implementations must be `Send + Sync`; the buffer pool shares one
/// backend across all of its frames. All methods are async so that the
/// disk-backed implementation can use `tokio::fs` without blocking the
/// runtime; [`MemoryStorage`] completes immediately.
pub trait Storage: Send + Sync {
    /// Reads a page into `buf`, which must be exactly one page long.
    ///
    /// # Errors
    ///
    /// `PageNotFound` if the page has never been allocated;
    /// `InvalidBufferSize` for a wrongly sized buffer.
    fn read_page(
        &self,
        page_id: PageId,
        buf: &mut [u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Writes a page from `buf`, which must be exactly one page long.
    ///
    /// # Errors
    ///
    /// `PageNotFound` if the page has never been allocated;
    /// `InvalidBufferSize` for a wrongly sized buffer.
    fn write_page(
        &self,
        page_id: PageId,
        buf: &[u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Allocates a new zeroed page and returns its id.
    ///
    /// Allocation is sequential: the first page of an empty backend is
    /// always `PageId(0)`. The heap layer relies on this to place the file
    /// header at page 0.
    fn allocate_page(
        &self,
    ) -> impl std::future::Future<Output = Result<PageId, StorageError>> + Send;

    /// Number of pages allocated so far.
    fn page_count(&self) -> impl std::future::Future<Output = usize> + Send;

    /// Forces pending writes down to the physical device.
    fn sync_all(&self) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}
