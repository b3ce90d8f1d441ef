//! Sequential scans over a heap file.
//!
//! [`HeapFileScan`] walks every data page of the file in chain order and
//! every record in slot order, yielding the record ids that satisfy an
//! optional typed filter. The cursor supports mark/reset checkpoints (for
//! re-scanning the inner side of a join), deleting the current record, and
//! declaring the current page dirty after in-place mutation of a borrowed
//! record view.

use std::cmp::Ordering;

use super::error::{HeapError, HeapFileError};
use super::file::HeapFile;
use super::page::{DataPage, Rid};
use crate::storage::{BufferPool, PageId, Replacer, Storage};

/// Type a filter compares under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    /// 4-byte little-endian signed integer.
    Integer,
    /// 4-byte little-endian IEEE float.
    Float,
    /// Raw bytes, compared lexicographically.
    String,
}

/// Comparison applied between the record field and the filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl CompareOp {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Lt => ord.is_lt(),
            CompareOp::Le => ord.is_le(),
            CompareOp::Eq => ord.is_eq(),
            CompareOp::Ge => ord.is_ge(),
            CompareOp::Gt => ord.is_gt(),
            CompareOp::Ne => ord.is_ne(),
        }
    }
}

/// Wire size of numeric filter operands.
const NUMERIC_SIZE: usize = 4;

/// A validated filter: compare `length` bytes at `offset` of each record
/// against `value` under `op`.
#[derive(Debug, Clone)]
struct ScanFilter {
    offset: usize,
    length: usize,
    datatype: Datatype,
    op: CompareOp,
    value: Vec<u8>,
}

// Numeric fields are decoded into stack temporaries rather than cast in
// place; record payloads carry no alignment.
fn read_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0u8; NUMERIC_SIZE];
    buf.copy_from_slice(&bytes[..NUMERIC_SIZE]);
    i32::from_le_bytes(buf)
}

fn read_f32(bytes: &[u8]) -> f32 {
    let mut buf = [0u8; NUMERIC_SIZE];
    buf.copy_from_slice(&bytes[..NUMERIC_SIZE]);
    f32::from_le_bytes(buf)
}

impl ScanFilter {
    /// Whether `record` satisfies the filter.
    ///
    /// A field reaching past the end of the record is a non-match, not an
    /// error; so is a NaN on either side of a float comparison.
    fn matches(&self, record: &[u8]) -> bool {
        if self.offset + self.length > record.len() {
            return false;
        }
        let field = &record[self.offset..self.offset + self.length];
        let ord = match self.datatype {
            Datatype::Integer => read_i32(field).cmp(&read_i32(&self.value)),
            Datatype::Float => match read_f32(field).partial_cmp(&read_f32(&self.value)) {
                Some(ord) => ord,
                None => return false,
            },
            Datatype::String => field.cmp(self.value.as_slice()),
        };
        self.op.accepts(ord)
    }
}

/// Forward cursor over all records of a heap file.
pub struct HeapFileScan<'p, S: Storage, R: Replacer> {
    file: HeapFile<'p, S, R>,
    filter: Option<ScanFilter>,
    mark: Option<(PageId, Option<Rid>)>,
}

impl<'p, S: Storage, R: Replacer> HeapFileScan<'p, S, R> {
    /// Opens a scan handle with no filter. The cursor starts before the
    /// first record of the first data page.
    pub async fn open(pool: &'p BufferPool<S, R>) -> Result<Self, HeapFileError> {
        Ok(Self {
            file: HeapFile::open(pool).await?,
            filter: None,
            mark: None,
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

    /// Installs or clears the filter predicate.
    ///
    /// `filter = None` clears any existing filter; every record then
    /// matches. The cursor is deliberately left where it is, so a scan can
    /// be reconfigured mid-file; open a new handle for a fresh pass.
    ///
    /// # Errors
    ///
    /// `BadScanParam` if `length` is zero, a numeric filter is not exactly
    /// 4 bytes wide, or the filter value's length disagrees with `length`.
    pub fn start_scan(
        &mut self,
        offset: usize,
        length: usize,
        datatype: Datatype,
        filter: Option<&[u8]>,
        op: CompareOp,
    ) -> Result<(), HeapFileError> {
        let Some(value) = filter else {
            self.filter = None;
            return Ok(());
        };

        if length == 0 {
            return Err(HeapFileError::BadScanParam("filter length must be at least 1"));
        }
        if matches!(datatype, Datatype::Integer | Datatype::Float) && length != NUMERIC_SIZE {
            return Err(HeapFileError::BadScanParam(
                "numeric filters compare exactly 4 bytes",
            ));
        }
        if value.len() != length {
            return Err(HeapFileError::BadScanParam(
                "filter value does not match the declared length",
            ));
        }

        self.filter = Some(ScanFilter {
            offset,
            length,
            datatype,
            op,
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Advances to the next matching record and returns its id, or `None`
    /// at the end of the page chain.
    ///
    /// Walks the current page from the cursor, then follows next-page
    /// links, unpinning each exhausted page with its accumulated dirty
    /// flag. After [`end_scan`](Self::end_scan) this returns `None`.
    pub async fn scan_next(&mut self) -> Result<Option<Rid>, HeapFileError> {
        loop {
            let (matched, next_page) = {
                let Some(guard) = self.file.cur.as_ref() else {
                    return Ok(None);
                };
                let page_id = guard.page_id();
                let page = DataPage::new(&**guard);

                let mut prev = self.file.cur_rec.map(|rid| rid.slot_id);
                let mut matched = None;
                loop {
                    let slot = match prev {
                        None => page.first_record(),
                        Some(s) => page.next_record(s),
                    };
                    let Some(slot) = slot else { break };
                    if let Some(record) = page.read(slot) {
                        let ok = match &self.filter {
                            None => true,
                            Some(f) => f.matches(record),
                        };
                        if ok {
                            matched = Some(Rid::new(page_id, slot));
                            break;
                        }
                    }
                    prev = Some(slot);
                }
                (matched, page.next_page())
            };

            if let Some(rid) = matched {
                self.file.cur_rec = Some(rid);
                return Ok(Some(rid));
            }
            match next_page {
                None => return Ok(None),
                Some(next) => self.file.pin_page(next).await?,
            }
        }
    }

    /// Returns the record at the cursor without advancing it.
    ///
    /// The slice borrows the pinned current page and is invalidated by the
    /// next operation on this handle.
    pub fn record(&self) -> Result<&[u8], HeapFileError> {
        let rid = self.file.cur_rec.ok_or(HeapFileError::NoCurrentRecord)?;
        let guard = self.file.cur.as_ref().ok_or(HeapFileError::NoCurrentPage)?;
        DataPage::new(&**guard)
            .read(rid.slot_id)
            .ok_or_else(|| HeapError::SlotNotFound(rid.slot_id).into())
    }

    /// Deletes the record at the cursor and updates the file's record
    /// count. The cursor stays on the deleted id, so the next
    /// [`scan_next`](Self::scan_next) yields the record after it.
    pub fn delete_record(&mut self) -> Result<(), HeapFileError> {
        let rid = self.file.cur_rec.ok_or(HeapFileError::NoCurrentRecord)?;
        let guard = self.file.cur_page_mut()?;
        DataPage::new(&mut **guard).delete(rid.slot_id)?;
        guard.mark_dirty();

        self.file.header.rec_cnt -= 1;
        self.file.write_header();
        Ok(())
    }

    /// Returns the record at the cursor for in-place mutation.
    ///
    /// Mutations are only durable if [`mark_dirty`](Self::mark_dirty) is
    /// called before the page is unpinned.
    pub fn record_mut(&mut self) -> Result<&mut [u8], HeapFileError> {
        let rid = self.file.cur_rec.ok_or(HeapFileError::NoCurrentRecord)?;
        let guard = self.file.cur_page_mut()?;
        DataPage::new(&mut **guard)
            .record_mut(rid.slot_id)
            .ok_or_else(|| HeapError::SlotNotFound(rid.slot_id).into())
    }

    /// Declares the current page dirty. For callers that mutate record
    /// bytes in place through [`record_mut`](Self::record_mut).
    pub fn mark_dirty(&mut self) -> Result<(), HeapFileError> {
        self.file.cur_page_mut()?.mark_dirty();
        Ok(())
    }

    /// Checkpoints the cursor position.
    pub fn mark_scan(&mut self) -> Result<(), HeapFileError> {
        let page_id = self.file.cur_page_id().ok_or(HeapFileError::NoCurrentPage)?;
        self.mark = Some((page_id, self.file.cur_rec));
        Ok(())
    }

    /// Restores the cursor to the last [`mark_scan`](Self::mark_scan)
    /// checkpoint, switching pages if the scan has moved on. The mark
    /// survives, so repeated resets replay the same records.
    pub async fn reset_scan(&mut self) -> Result<(), HeapFileError> {
        let (page_id, rec) = self.mark.ok_or(HeapFileError::ScanNotMarked)?;
        if self.file.cur_page_id() != Some(page_id) {
            self.file.pin_page(page_id).await?;
        }
        self.file.cur_rec = rec;
        Ok(())
    }

    /// Unpins the current page and parks the scan. Idempotent; the header
    /// stays pinned until [`close`](Self::close).
    pub fn end_scan(&mut self) {
        self.file.cur = None;
        self.file.cur_rec = None;
    }
}
