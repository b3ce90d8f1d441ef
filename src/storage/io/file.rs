//! Disk-backed page storage.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::Storage;
use crate::storage::error::StorageError;
use crate::storage::page::{PageId, PAGE_SIZE};

/// Page storage over a single file of contiguous 8KB pages.
///
/// Page `n` lives at byte offset `n * PAGE_SIZE`. A `tokio::sync::Mutex`
/// around the file handle serializes seeks against reads and writes; the
/// page count is tracked separately so existence checks do not take the
/// handle lock.
pub struct FileStorage {
    path: PathBuf,
    file: Mutex<File>,
    page_count: AtomicU64,
}

impl FileStorage {
    /// Creates a new storage file. Fails if `path` already exists.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            page_count: AtomicU64::new(0),
        })
    }

    /// Opens an existing storage file and derives its page count from the
    /// file size.
    ///
    /// # Errors
    ///
    /// `Corrupted` if the size is not a whole number of pages; `Io` with
    /// kind `NotFound` if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).open(&path).await?;

        let file_size = file.metadata().await?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::Corrupted(format!(
                "{} is {} bytes, not a whole number of {}-byte pages",
                path.display(),
                file_size,
                PAGE_SIZE
            )));
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
            page_count: AtomicU64::new(file_size / PAGE_SIZE as u64),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_bounds(&self, page_id: PageId) -> Result<(), StorageError> {
        if page_id.page_num() >= self.page_count.load(Ordering::Acquire) {
            return Err(StorageError::PageNotFound(page_id));
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    async fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }
        self.check_bounds(page_id)?;

        let mut file = self.file.lock().await;
        file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
            .await?;
        file.read_exact(buf).await?;
        Ok(())
    }

    async fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }
        self.check_bounds(page_id)?;

        let mut file = self.file.lock().await;
        file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
            .await?;
        file.write_all(buf).await?;
        Ok(())
    }

    async fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut file = self.file.lock().await;

        let page_num = self.page_count.load(Ordering::Acquire);
        let page_id = PageId::new(page_num);

        // Extend the file with a zeroed page before publishing the id.
        file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
            .await?;
        file.write_all(&[0u8; PAGE_SIZE]).await?;
        self.page_count.store(page_num + 1, Ordering::Release);

        Ok(page_id)
    }

    async fn page_count(&self) -> usize {
        self.page_count.load(Ordering::Acquire) as usize
    }

    async fn sync_all(&self) -> Result<(), StorageError> {
        let file = self.file.lock().await;
        file.sync_all().await?;
        Ok(())
    }
}
