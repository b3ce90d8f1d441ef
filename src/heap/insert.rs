//! Append-only record insertion.
//!
//! [`InsertFileScan`] always inserts into the last page of the chain.
//! When that page cannot hold the record, a fresh page is allocated,
//! linked in behind the old last page, and the insert retries there. The
//! handle — not the buffer pool — writes the chain link, and it does so
//! before the old last page is unpinned.

use super::error::{HeapError, HeapFileError};
use super::file::HeapFile;
use super::page::{DataPage, Rid, MAX_RECORD_SIZE};
use crate::storage::{BufferPool, Replacer, Storage};

/// Insert cursor over a heap file.
pub struct InsertFileScan<'p, S: Storage, R: Replacer> {
    file: HeapFile<'p, S, R>,
}

impl<'p, S: Storage, R: Replacer> InsertFileScan<'p, S, R> {
    /// Opens an insert handle on the heap file stored in `pool`.
    pub async fn open(pool: &'p BufferPool<S, R>) -> Result<Self, HeapFileError> {
        Ok(Self {
            file: HeapFile::open(pool).await?,
        })
    }

    /// Unpins everything and flushes the file. See [`HeapFile::close`].
    pub async fn close(self) -> Result<(), HeapFileError> {
        self.file.close().await
    }

    /// Number of live records in the file.
    pub fn rec_cnt(&self) -> u32 {
        self.file.rec_cnt()
    }

    /// Number of data pages in the file.
    pub fn page_cnt(&self) -> u32 {
        self.file.page_cnt()
    }

    /// Appends a record and returns its id.
    ///
    /// # Errors
    ///
    /// `RecordTooLarge` if the record can never fit on a page; buffer-pool
    /// and storage errors are surfaced unchanged. On error the file's
    /// counters are untouched.
    pub async fn insert_record(&mut self, record: &[u8]) -> Result<Rid, HeapFileError> {
        if record.len() > MAX_RECORD_SIZE {
            return Err(HeapFileError::RecordTooLarge {
                size: record.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        // Inserts go to the last page of the chain; reposition if a scan
        // of this handle's file moved the current page elsewhere.
        let last_page = self.file.header.last_page;
        self.file.pin_page(last_page).await?;

        let inserted = {
            let guard = self.file.cur_page_mut()?;
            let result = DataPage::new(&mut **guard).insert(record);
            if result.is_ok() {
                guard.mark_dirty();
            }
            result
        };

        let rid = match inserted {
            Ok(slot_id) => Rid::new(last_page, slot_id),
            Err(HeapError::PageFull { .. }) => self.append_page_and_insert(record).await?,
            Err(other) => return Err(other.into()),
        };

        self.file.header.rec_cnt += 1;
        self.file.write_header();
        self.file.cur_rec = Some(rid);
        Ok(rid)
    }

    /// Grows the chain by one page and inserts `record` there.
    async fn append_page_and_insert(&mut self, record: &[u8]) -> Result<Rid, HeapFileError> {
        let mut new_guard = self.file.pool.new_page().await?;
        let new_page_id = new_guard.page_id();
        DataPage::new(&mut *new_guard).init(new_page_id);
        new_guard.mark_dirty();

        // Link the old last page to the new one while it is still pinned.
        {
            let guard = self.file.cur_page_mut()?;
            DataPage::new(&mut **guard).set_next_page(Some(new_page_id));
            guard.mark_dirty();
        }

        self.file.header.last_page = new_page_id;
        self.file.header.page_cnt += 1;
        self.file.write_header();

        // Swap the new page in as current; the old guard drops here and
        // unpins with its accumulated dirty flag.
        self.file.cur = Some(new_guard);
        self.file.cur_rec = None;

        let guard = self.file.cur_page_mut()?;
        // A second failure cannot be page-full: the record passed the
        // size check and the page is empty.
        let slot_id = DataPage::new(&mut **guard).insert(record)?;
        guard.mark_dirty();
        Ok(Rid::new(new_page_id, slot_id))
    }
}
