//! RAII page guards.
//!
//! A guard is a pinned page: constructing one increments the frame's pin
//! count, dropping it unpins exactly once. The write guard accumulates a
//! dirty flag via [`PageWriteGuard::mark_dirty`] and hands it to the pool
//! at unpin time, so "every mutation is reported before the unpin" holds
//! by construction.

use std::ops::{Deref, DerefMut};

use tokio::sync::{RwLockReadGuard, RwLockWriteGuard};

use super::frame::FrameId;
use super::pool::BufferPool;
use super::replacer::Replacer;
use crate::storage::io::Storage;
use crate::storage::page::{PageData, PageId};

/// Shared, read-only access to a pinned page.
pub struct PageReadGuard<'p, S: Storage, R: Replacer> {
    pub(super) pool: &'p BufferPool<S, R>,
    pub(super) frame_id: FrameId,
    pub(super) page_id: PageId,
    pub(super) data: RwLockReadGuard<'p, PageData>,
}

impl<S: Storage, R: Replacer> PageReadGuard<'_, S, R> {
    /// Id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<S: Storage, R: Replacer> Deref for PageReadGuard<'_, S, R> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl<S: Storage, R: Replacer> Drop for PageReadGuard<'_, S, R> {
    fn drop(&mut self) {
        self.pool.unpin(self.frame_id, false);
    }
}

/// Exclusive access to a pinned page.
///
/// Starts clean; callers that mutate the bytes must call `mark_dirty`
/// before the guard is dropped, or the mutation may be lost on eviction.
pub struct PageWriteGuard<'p, S: Storage, R: Replacer> {
    pub(super) pool: &'p BufferPool<S, R>,
    pub(super) frame_id: FrameId,
    pub(super) page_id: PageId,
    pub(super) data: RwLockWriteGuard<'p, PageData>,
    pub(super) dirty: bool,
}

impl<S: Storage, R: Replacer> PageWriteGuard<'_, S, R> {
    /// Id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Records that the page bytes were mutated. The flag is passed to the
    /// pool when the guard drops.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether a mutation has been recorded on this guard.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl<S: Storage, R: Replacer> Deref for PageWriteGuard<'_, S, R> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl<S: Storage, R: Replacer> DerefMut for PageWriteGuard<'_, S, R> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }
}

impl<S: Storage, R: Replacer> Drop for PageWriteGuard<'_, S, R> {
    fn drop(&mut self) {
        self.pool.unpin(self.frame_id, self.dirty);
    }
}
