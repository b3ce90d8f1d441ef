//! The buffer pool.
//!
//! Pages are cached in a fixed array of frames. Callers pin a page by
//! fetching a guard and unpin it by dropping the guard; a pinned page is
//! never evicted, and a page unpinned dirty is written back before its
//! frame is reused. The pool is the only component that talks to the
//! [`Storage`] backend.

use std::collections::HashMap;

use log::warn;
use parking_lot::Mutex;

use super::error::BufferPoolError;
use super::frame::{Frame, FrameId, FrameMeta};
use super::guard::{PageReadGuard, PageWriteGuard};
use super::replacer::Replacer;
use crate::storage::io::Storage;
use crate::storage::page::PageId;

/// Buffer pool configuration.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames. Each frame holds one page, so memory use is
    /// `pool_size * PAGE_SIZE`. A heap-file handle pins up to three pages
    /// at once (header, current page, and one page mid-allocation), so
    /// anything below that will starve.
    pub pool_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { pool_size: 128 }
    }
}

/// Page cache with pin counts, dirty tracking and pluggable eviction.
///
/// # Locking
///
/// Bookkeeping (page table, frame metadata, free list, replacer) sits
/// behind one `parking_lot::Mutex`, held only for map operations and never
/// across I/O. Page bytes sit behind a per-frame `tokio::sync::RwLock`
/// that guards hold for as long as the page is pinned. Guard drop unpins
/// synchronously through the state mutex, which is what lets unpinning
/// happen in `Drop`.
pub struct BufferPool<S: Storage, R: Replacer> {
    storage: S,
    frames: Vec<Frame>,
    state: Mutex<PoolState<R>>,
    config: BufferPoolConfig,
}

struct PoolState<R> {
    /// Which frame each cached page occupies.
    page_table: HashMap<PageId, FrameId>,
    /// Bookkeeping per frame, indexed by `FrameId`.
    meta: Vec<FrameMeta>,
    /// Frames not holding any page.
    free_list: Vec<FrameId>,
    /// Eviction policy over unpinned frames.
    replacer: R,
}

impl<S: Storage, R: Replacer> BufferPool<S, R> {
    /// Creates a pool over `storage` with `config.pool_size` frames.
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is zero.
    pub fn new(storage: S, replacer: R, config: BufferPoolConfig) -> Self {
        assert!(config.pool_size > 0, "buffer pool needs at least one frame");

        let frames = (0..config.pool_size).map(|_| Frame::new()).collect();
        let meta = (0..config.pool_size).map(|_| FrameMeta::new()).collect();
        let free_list = (0..config.pool_size).map(FrameId::new).collect();

        Self {
            storage,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(config.pool_size),
                meta,
                free_list,
                replacer,
            }),
            config,
        }
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Number of frames with at least one outstanding pin.
    pub fn pinned_count(&self) -> usize {
        self.state.lock().meta.iter().filter(|m| m.pin_count > 0).count()
    }

    /// Pins a page for reading.
    ///
    /// # Errors
    ///
    /// `NoFreeFrames` if every frame is pinned; `Storage` if the page does
    /// not exist or I/O fails.
    pub async fn fetch_page(
        &self,
        page_id: PageId,
    ) -> Result<PageReadGuard<'_, S, R>, BufferPoolError> {
        let frame_id = self.pin_frame(page_id).await?;
        let data = self.frames[frame_id.as_usize()].data.read().await;
        Ok(PageReadGuard {
            pool: self,
            frame_id,
            page_id,
            data,
        })
    }

    /// Pins a page for writing. The guard starts clean; call
    /// [`PageWriteGuard::mark_dirty`] after mutating.
    ///
    /// # Errors
    ///
    /// `NoFreeFrames` if every frame is pinned; `Storage` if the page does
    /// not exist or I/O fails.
    pub async fn fetch_page_mut(
        &self,
        page_id: PageId,
    ) -> Result<PageWriteGuard<'_, S, R>, BufferPoolError> {
        let frame_id = self.pin_frame(page_id).await?;
        let data = self.frames[frame_id.as_usize()].data.write().await;
        Ok(PageWriteGuard {
            pool: self,
            frame_id,
            page_id,
            data,
            dirty: false,
        })
    }

    /// Allocates a page in storage and pins it for writing.
    pub async fn new_page(&self) -> Result<PageWriteGuard<'_, S, R>, BufferPoolError> {
        let page_id = self.storage.allocate_page().await?;
        self.fetch_page_mut(page_id).await
    }

    /// Writes a page back to storage if it is cached and dirty.
    pub async fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let frame_id = {
            let state = self.state.lock();
            match state.page_table.get(&page_id) {
                Some(&fid) if state.meta[fid.as_usize()].is_dirty => fid,
                _ => return Ok(()),
            }
        };

        let data = self.frames[frame_id.as_usize()].data.read().await;
        self.storage.write_page(page_id, data.as_slice()).await?;
        drop(data);

        let mut state = self.state.lock();
        // The frame may have been recycled while we wrote; only then would
        // clearing the flag lose a mutation.
        if state.meta[frame_id.as_usize()].page_id == Some(page_id) {
            state.meta[frame_id.as_usize()].is_dirty = false;
        }
        Ok(())
    }

    /// Writes every dirty page back and syncs the backend.
    pub async fn flush_all(&self) -> Result<(), BufferPoolError> {
        let dirty: Vec<PageId> = {
            let state = self.state.lock();
            state
                .meta
                .iter()
                .filter(|m| m.is_dirty)
                .filter_map(|m| m.page_id)
                .collect()
        };

        for page_id in dirty {
            self.flush_page(page_id).await?;
        }

        self.storage.sync_all().await?;
        Ok(())
    }

    /// Releases one pin, recording whether the holder mutated the page.
    /// Called from guard `Drop`.
    pub(super) fn unpin(&self, frame_id: FrameId, is_dirty: bool) {
        let mut state = self.state.lock();
        let meta = &mut state.meta[frame_id.as_usize()];

        if meta.pin_count == 0 {
            warn!("unpin on frame {:?} with no outstanding pins", frame_id);
            return;
        }
        meta.pin_count -= 1;
        if is_dirty {
            meta.is_dirty = true;
        }
        if meta.pin_count == 0 {
            state.replacer.unpin(frame_id);
        }
    }

    /// Finds the frame holding `page_id`, loading the page if necessary,
    /// and takes one pin on it.
    async fn pin_frame(&self, page_id: PageId) -> Result<FrameId, BufferPoolError> {
        // Fast path: already cached.
        {
            let mut state = self.state.lock();
            if let Some(&frame_id) = state.page_table.get(&page_id) {
                state.meta[frame_id.as_usize()].pin_count += 1;
                state.replacer.pin(frame_id);
                return Ok(frame_id);
            }
        }

        // Miss: claim a frame and load the page into it. The state lock is
        // not held across the read.
        let frame_id = self.reclaim_frame().await?;

        let read_result = {
            let mut data = self.frames[frame_id.as_usize()].data.write().await;
            self.storage.read_page(page_id, data.as_mut_slice()).await
        };
        if let Err(e) = read_result {
            self.state.lock().free_list.push(frame_id);
            return Err(e.into());
        }

        let mut state = self.state.lock();
        // A concurrent caller may have loaded the same page meanwhile; use
        // its frame and return ours to the free list.
        if let Some(&winner) = state.page_table.get(&page_id) {
            state.free_list.push(frame_id);
            state.meta[winner.as_usize()].pin_count += 1;
            state.replacer.pin(winner);
            return Ok(winner);
        }
        state.page_table.insert(page_id, frame_id);
        state.meta[frame_id.as_usize()].reset(page_id);
        Ok(frame_id)
    }

    /// Produces an empty frame, evicting an unpinned page if none is free.
    async fn reclaim_frame(&self) -> Result<FrameId, BufferPoolError> {
        {
            let mut state = self.state.lock();
            if let Some(frame_id) = state.free_list.pop() {
                return Ok(frame_id);
            }
        }

        loop {
            let frame_id = match self.state.lock().replacer.victim() {
                Some(fid) => fid,
                None => return Err(BufferPoolError::NoFreeFrames),
            };

            let (old_page, is_dirty) = {
                let state = self.state.lock();
                let meta = &state.meta[frame_id.as_usize()];
                (meta.page_id, meta.is_dirty)
            };

            if is_dirty {
                if let Some(old_page) = old_page {
                    let data = self.frames[frame_id.as_usize()].data.read().await;
                    self.storage.write_page(old_page, data.as_slice()).await?;
                }
            }

            let mut state = self.state.lock();
            // Re-pinned while we were writing back; pick another victim.
            if state.meta[frame_id.as_usize()].pin_count > 0 {
                continue;
            }
            if let Some(old_page) = old_page {
                state.page_table.remove(&old_page);
            }
            state.meta[frame_id.as_usize()].clear();
            return Ok(frame_id);
        }
    }
}
