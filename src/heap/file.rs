//! Heap-file handles and file lifecycle.
//!
//! An open heap file is a value holding the shared pin discipline: the
//! header page stays pinned (and exclusively held) for the whole life of
//! the handle, and at most one data page — the "current" page — is pinned
//! at a time. The scan and insert handles in the sibling modules each own
//! one of these and layer a cursor on top.
//!
//! Because the header is held exclusively, a file supports one handle at a
//! time; higher layers that want concurrent readers must arrange their own
//! sharing.

use log::debug;

use super::error::{HeapError, HeapFileError};
use super::header::{FileHeader, FILE_HEADER_SIZE};
use super::page::{DataPage, Rid};
use crate::storage::{
    BufferPool, BufferPoolConfig, ClockReplacer, FileManager, PageId, PageWriteGuard, Replacer,
    Storage, MAX_NAME_SIZE,
};

/// The header always occupies page 0 of the file.
pub const HEADER_PAGE: PageId = PageId::new(0);

/// Frames for the short-lived pool behind `create_heap_file`. Formatting
/// holds the header page and the first data page pinned at the same time.
const FORMAT_POOL_FRAMES: usize = 2;

/// Creates a new heap file: a header page plus one empty data page.
///
/// Both pages exist (and are flushed) before this returns; any
/// intermediate error aborts without leaving a half-initialized file
/// header behind.
///
/// # Errors
///
/// `InvalidName` if the name exceeds [`MAX_NAME_SIZE`]` - 1` bytes;
/// `FileExists` if a file with this name is already present; storage and
/// buffer-pool errors are surfaced unchanged.
pub async fn create_heap_file(files: &FileManager, name: &str) -> Result<(), HeapFileError> {
    if name.len() > MAX_NAME_SIZE - 1 {
        return Err(HeapFileError::InvalidName(name.to_string()));
    }
    if files.exists(name) {
        return Err(HeapFileError::FileExists(name.to_string()));
    }

    let storage = files.create(name).await?;
    let pool = BufferPool::new(
        storage,
        ClockReplacer::with_capacity(FORMAT_POOL_FRAMES),
        BufferPoolConfig {
            pool_size: FORMAT_POOL_FRAMES,
        },
    );
    format_new_file(&pool, name).await?;
    pool.flush_all().await?;

    debug!("created heap file {:?}", name);
    Ok(())
}

/// Removes a heap file from disk. The file must not be open.
pub async fn destroy_heap_file(files: &FileManager, name: &str) -> Result<(), HeapFileError> {
    files.destroy(name).await?;
    debug!("destroyed heap file {:?}", name);
    Ok(())
}

/// Writes the initial header page and first data page of an empty file.
pub(super) async fn format_new_file<S: Storage, R: Replacer>(
    pool: &BufferPool<S, R>,
    name: &str,
) -> Result<(), HeapFileError> {
    let mut header_guard = pool.new_page().await?;
    if header_guard.page_id() != HEADER_PAGE {
        return Err(HeapFileError::Corrupt(format!(
            "fresh file allocated {} as its first page",
            header_guard.page_id()
        )));
    }

    let mut data_guard = pool.new_page().await?;
    let data_page_id = data_guard.page_id();
    DataPage::new(&mut *data_guard).init(data_page_id);
    data_guard.mark_dirty();

    FileHeader::new(name, data_page_id).write_to(&mut header_guard[..FILE_HEADER_SIZE]);
    header_guard.mark_dirty();
    Ok(())
}

/// An open heap file.
///
/// Holds the pinned header page, its decoded [`FileHeader`] mirror, and
/// the pinned current data page. Records handed out by [`record`] borrow
/// the pinned page and cannot outlive the next operation on the handle —
/// the borrow checker enforces what the original pin discipline only
/// documented.
///
/// [`record`]: HeapFile::record
pub struct HeapFile<'p, S: Storage, R: Replacer> {
    pub(super) pool: &'p BufferPool<S, R>,
    header_guard: PageWriteGuard<'p, S, R>,
    pub(super) header: FileHeader,
    pub(super) cur: Option<PageWriteGuard<'p, S, R>>,
    pub(super) cur_rec: Option<Rid>,
}

impl<'p, S: Storage, R: Replacer> HeapFile<'p, S, R> {
    /// Opens the heap file stored in `pool`'s backing storage: pins the
    /// header page, decodes it, and pins the first data page as current.
    pub async fn open(pool: &'p BufferPool<S, R>) -> Result<Self, HeapFileError> {
        let header_guard = pool.fetch_page_mut(HEADER_PAGE).await?;
        let header = FileHeader::read_from(&header_guard[..FILE_HEADER_SIZE])?;
        if header.first_page == HEADER_PAGE || header.last_page == HEADER_PAGE {
            return Err(HeapFileError::Corrupt(
                "data-page chain includes the header page".into(),
            ));
        }

        let cur = pool.fetch_page_mut(header.first_page).await?;
        Ok(Self {
            pool,
            header_guard,
            header,
            cur: Some(cur),
            cur_rec: None,
        })
    }

    /// Unpins everything and flushes the file's dirty pages to storage.
    ///
    /// Dropping a handle without calling `close` also unpins cleanly, but
    /// leaves dirty pages to be written back on eviction.
    pub async fn close(mut self) -> Result<(), HeapFileError> {
        self.cur = None;
        let pool = self.pool;
        drop(self);
        pool.flush_all().await?;
        Ok(())
    }

    /// Name the file was created under.
    pub fn file_name(&self) -> &str {
        &self.header.file_name
    }

    /// Number of live records in the file.
    pub fn rec_cnt(&self) -> u32 {
        self.header.rec_cnt
    }

    /// Number of data pages in the file (the header page is not counted).
    pub fn page_cnt(&self) -> u32 {
        self.header.page_cnt
    }

    /// Returns the record at `rid`, switching the current page if the
    /// record lives elsewhere. On success the cursor moves to `rid`.
    ///
    /// The returned slice borrows the pinned page; it is invalidated by
    /// the next operation on this handle.
    pub async fn record(&mut self, rid: Rid) -> Result<&[u8], HeapFileError> {
        if rid.page_id == HEADER_PAGE {
            return Err(HeapFileError::InvalidRid(rid));
        }
        self.pin_page(rid.page_id).await?;

        let guard = self.cur.as_ref().ok_or(HeapFileError::NoCurrentPage)?;
        let page = DataPage::new(&**guard);
        match page.read(rid.slot_id) {
            Some(record) => {
                self.cur_rec = Some(rid);
                Ok(record)
            }
            None => Err(HeapError::SlotNotFound(rid.slot_id).into()),
        }
    }

    /// Makes `page_id` the current page.
    ///
    /// A no-op when it already is; otherwise the old page is unpinned
    /// first (carrying its accumulated dirty flag) and the cursor is
    /// cleared.
    pub(super) async fn pin_page(&mut self, page_id: PageId) -> Result<(), HeapFileError> {
        if self.cur_page_id() == Some(page_id) {
            return Ok(());
        }
        self.cur = None;
        self.cur_rec = None;
        self.cur = Some(self.pool.fetch_page_mut(page_id).await?);
        Ok(())
    }

    /// Page id of the current data page, if one is pinned.
    pub(super) fn cur_page_id(&self) -> Option<PageId> {
        self.cur.as_ref().map(|guard| guard.page_id())
    }

    /// The current page's guard, for mutation.
    pub(super) fn cur_page_mut(
        &mut self,
    ) -> Result<&mut PageWriteGuard<'p, S, R>, HeapFileError> {
        self.cur.as_mut().ok_or(HeapFileError::NoCurrentPage)
    }

    /// Writes the header mirror back to the pinned header page and marks
    /// it dirty. Call after mutating any header field.
    pub(super) fn write_header(&mut self) {
        self.header.write_to(&mut self.header_guard[..FILE_HEADER_SIZE]);
        self.header_guard.mark_dirty();
    }
}

impl<S: Storage, R: Replacer> Drop for HeapFile<'_, S, R> {
    fn drop(&mut self) {
        debug!("releasing heap file handle for {:?}", self.header.file_name);
    }
}
