//! Heap-file header page.
//!
//! Page 0 of every heap file holds the file-wide metadata: the file name
//! and the bounds and counters of the data-page chain. The heap-file
//! handle keeps this page pinned for its whole lifetime and writes the
//! header back whenever a counter changes.

use super::error::HeapFileError;
use crate::storage::{PageId, MAX_NAME_SIZE};

/// Serialized size of the header, at offset 0 of the header page.
///
/// Layout, little-endian:
/// - `file_name`: `[u8; MAX_NAME_SIZE]`, NUL-terminated
/// - `first_page`: u64
/// - `last_page`: u64
/// - `page_cnt`: u32
/// - `rec_cnt`: u32
pub const FILE_HEADER_SIZE: usize = MAX_NAME_SIZE + 8 + 8 + 4 + 4;

/// Decoded heap-file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Name the file was created under.
    pub file_name: String,
    /// First data page of the chain.
    pub first_page: PageId,
    /// Last data page of the chain; its next-page link is empty.
    pub last_page: PageId,
    /// Number of data pages. The header page itself is not counted.
    pub page_cnt: u32,
    /// Live records across all data pages.
    pub rec_cnt: u32,
}

impl FileHeader {
    /// Header for a freshly created file with one empty data page.
    ///
    /// The name must already be validated against [`MAX_NAME_SIZE`].
    pub fn new(file_name: &str, data_page: PageId) -> Self {
        debug_assert!(file_name.len() < MAX_NAME_SIZE);
        Self {
            file_name: file_name.to_string(),
            first_page: data_page,
            last_page: data_page,
            page_cnt: 1,
            rec_cnt: 0,
        }
    }

    /// Decodes a header from the front of a header page.
    ///
    /// # Errors
    ///
    /// `Corrupt` if the name field is not NUL-terminated UTF-8.
    pub fn read_from(data: &[u8]) -> Result<Self, HeapFileError> {
        let name_field = &data[..MAX_NAME_SIZE];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| HeapFileError::Corrupt("file name is not NUL-terminated".into()))?;
        let file_name = std::str::from_utf8(&name_field[..name_len])
            .map_err(|_| HeapFileError::Corrupt("file name is not UTF-8".into()))?
            .to_string();

        let mut u64_buf = [0u8; 8];
        let mut u32_buf = [0u8; 4];

        u64_buf.copy_from_slice(&data[MAX_NAME_SIZE..MAX_NAME_SIZE + 8]);
        let first_page = PageId::new(u64::from_le_bytes(u64_buf));
        u64_buf.copy_from_slice(&data[MAX_NAME_SIZE + 8..MAX_NAME_SIZE + 16]);
        let last_page = PageId::new(u64::from_le_bytes(u64_buf));
        u32_buf.copy_from_slice(&data[MAX_NAME_SIZE + 16..MAX_NAME_SIZE + 20]);
        let page_cnt = u32::from_le_bytes(u32_buf);
        u32_buf.copy_from_slice(&data[MAX_NAME_SIZE + 20..MAX_NAME_SIZE + 24]);
        let rec_cnt = u32::from_le_bytes(u32_buf);

        Ok(Self {
            file_name,
            first_page,
            last_page,
            page_cnt,
            rec_cnt,
        })
    }

    /// Encodes the header into the front of a header page.
    pub fn write_to(&self, data: &mut [u8]) {
        debug_assert!(self.file_name.len() < MAX_NAME_SIZE);

        data[..MAX_NAME_SIZE].fill(0);
        data[..self.file_name.len()].copy_from_slice(self.file_name.as_bytes());
        data[MAX_NAME_SIZE..MAX_NAME_SIZE + 8]
            .copy_from_slice(&self.first_page.page_num().to_le_bytes());
        data[MAX_NAME_SIZE + 8..MAX_NAME_SIZE + 16]
            .copy_from_slice(&self.last_page.page_num().to_le_bytes());
        data[MAX_NAME_SIZE + 16..MAX_NAME_SIZE + 20].copy_from_slice(&self.page_cnt.to_le_bytes());
        data[MAX_NAME_SIZE + 20..MAX_NAME_SIZE + 24].copy_from_slice(&self.rec_cnt.to_le_bytes());
    }
}
