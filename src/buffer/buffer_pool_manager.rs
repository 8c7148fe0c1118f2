use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

use crate::common::{FrameId, PageId, QuarryError, Result, INVALID_PAGE_ID, PAGE_SIZE};
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::{FrameHeader, LruKReplacer, PageGuard, ReadPageGuard, WritePageGuard};

/// Bookkeeping guarded by the single buffer pool mutex.
struct PoolInner {
    /// Maps resident page IDs to their frames. A page ID is in at most one
    /// frame.
    page_table: HashMap<PageId, FrameId>,
    /// Frames not holding any page.
    free_list: VecDeque<FrameId>,
}

/// State shared between the manager and the release callbacks of its guards.
struct BufferPoolState {
    frames: Vec<Arc<FrameHeader>>,
    inner: Mutex<PoolInner>,
    replacer: LruKReplacer,
    /// Monotonic page-id allocator, seeded past any page already on disk.
    next_page_id: AtomicU32,
}

impl BufferPoolState {
    /// Decrement a page's pin, folding in the guard's dirty flag. The frame
    /// becomes evictable when the last pin drops.
    fn unpin(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.as_usize()];
        if frame.pin_count() == 0 {
            return false;
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        if let Some(0) = frame.unpin() {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }
}

/// BufferPoolManager caches disk pages in a fixed set of frames.
///
/// It maps page IDs to frames through a page table, hands out RAII guards
/// that pin (and optionally latch) a frame, and falls back to the LRU-K
/// replacer when no free frame remains. All frame state transitions happen
/// under one pool mutex; disk I/O for misses and dirty evictions is issued
/// while that mutex is held.
pub struct BufferPoolManager {
    pool_size: usize,
    state: Arc<BufferPoolState>,
    disk_scheduler: DiskScheduler,
}

impl BufferPoolManager {
    /// Creates a buffer pool with `pool_size` frames and an LRU-K replacer
    /// of the given `k`. Every frame starts on the free list.
    pub fn new(pool_size: usize, k: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(FrameHeader::new(frame_id)));
            free_list.push_back(frame_id);
        }

        let state = Arc::new(BufferPoolState {
            frames,
            inner: Mutex::new(PoolInner {
                page_table: HashMap::new(),
                free_list,
            }),
            replacer: LruKReplacer::new(k, pool_size),
            next_page_id: AtomicU32::new(disk_manager.num_pages()),
        });

        Self {
            pool_size,
            state,
            disk_scheduler: DiskScheduler::new(disk_manager),
        }
    }

    /// Allocates a fresh page in a frame and pins it once.
    /// Fails with `BufferPoolFull` when every frame is pinned.
    pub fn new_page(&self) -> Result<PageId> {
        let mut inner = self.state.inner.lock();
        let frame_id = self.acquire_frame(&mut inner)?;

        let page_id = PageId::new(self.state.next_page_id.fetch_add(1, Ordering::SeqCst));
        let frame = &self.state.frames[frame_id.as_usize()];
        frame.set_page_id(page_id);
        frame.pin();

        inner.page_table.insert(page_id, frame_id);
        self.state.replacer.record_access(frame_id);
        self.state.replacer.set_evictable(frame_id, false);

        Ok(page_id)
    }

    /// Like [`new_page`](Self::new_page), but wraps the pinned page in a
    /// basic guard so the pin is released on drop.
    pub fn new_page_guarded(&self) -> Result<PageGuard> {
        let page_id = self.new_page()?;

        let frame = {
            let inner = self.state.inner.lock();
            // Just created and still pinned, so it cannot have been evicted.
            let frame_id = inner.page_table[&page_id];
            Arc::clone(&self.state.frames[frame_id.as_usize()])
        };

        Ok(PageGuard::new(page_id, frame, self.release_callback()))
    }

    /// Fetches a page with a pin only (no latch).
    pub fn fetch_page_basic(&self, page_id: PageId) -> Result<PageGuard> {
        let frame = self.pin_page(page_id)?;
        Ok(PageGuard::new(page_id, frame, self.release_callback()))
    }

    /// Fetches a page and takes the frame's shared latch.
    /// The latch is acquired after the pin, outside the pool mutex.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard> {
        let frame = self.pin_page(page_id)?;
        Ok(unsafe { ReadPageGuard::new(page_id, frame, self.release_callback()) })
    }

    /// Fetches a page and takes the frame's exclusive latch.
    /// The latch is acquired after the pin, outside the pool mutex.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard> {
        let frame = self.pin_page(page_id)?;
        Ok(unsafe { WritePageGuard::new(page_id, frame, self.release_callback()) })
    }

    /// Drops one pin from a page, OR-combining `is_dirty` into its dirty
    /// flag. Returns false for unknown pages and for pages not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.state.unpin(page_id, is_dirty)
    }

    /// Writes a page out regardless of its dirty bit and clears the bit.
    /// Pin state is unchanged on return; flushing a pinned page is fine.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Err(QuarryError::InvalidPageId(page_id));
        }

        // Pin the frame so it stays resident, then copy its bytes outside
        // the pool mutex. Latching while holding the mutex would deadlock
        // against a writer that holds the latch and needs the mutex.
        let frame = {
            let inner = self.state.inner.lock();
            let Some(&frame_id) = inner.page_table.get(&page_id) else {
                return Ok(false);
            };
            let frame = &self.state.frames[frame_id.as_usize()];
            frame.pin();
            self.state.replacer.set_evictable(frame_id, false);
            Arc::clone(frame)
        };

        let mut data = [0u8; PAGE_SIZE];
        frame.copy_to(&mut data);
        let written = self.disk_scheduler.schedule_write_sync(page_id, &data);
        frame.set_dirty(false);
        self.state.unpin(page_id, false);
        written?;

        Ok(true)
    }

    /// Flushes every resident page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let page_ids: Vec<PageId> = {
            let inner = self.state.inner.lock();
            inner.page_table.keys().copied().collect()
        };

        for page_id in page_ids {
            self.flush_page(page_id)?;
        }

        Ok(())
    }

    /// Removes a page from the pool, returning its frame to the free list.
    /// Absent pages count as success; pinned pages are an error.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.state.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = &self.state.frames[frame_id.as_usize()];

        if frame.pin_count() > 0 {
            return Err(QuarryError::PageStillPinned(page_id));
        }

        inner.page_table.remove(&page_id);
        self.state.replacer.remove(frame_id);
        frame.reset();
        inner.free_list.push_back(frame_id);

        self.disk_scheduler.disk_manager().deallocate_page(page_id)?;

        Ok(true)
    }

    /// Returns the pin count of a resident page, or None if not resident.
    pub fn pin_count_of(&self, page_id: PageId) -> Option<u32> {
        let inner = self.state.inner.lock();
        inner
            .page_table
            .get(&page_id)
            .map(|&frame_id| self.state.frames[frame_id.as_usize()].pin_count())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.inner.lock().free_list.len()
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        self.disk_scheduler.disk_manager()
    }

    /// Pins the page into a frame, reading it from disk on a miss.
    /// Returns the pinned frame; the caller builds a guard around it.
    fn pin_page(&self, page_id: PageId) -> Result<Arc<FrameHeader>> {
        if page_id == INVALID_PAGE_ID {
            return Err(QuarryError::InvalidPageId(page_id));
        }

        let mut inner = self.state.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &self.state.frames[frame_id.as_usize()];
            frame.pin();
            self.state.replacer.record_access(frame_id);
            self.state.replacer.set_evictable(frame_id, false);
            return Ok(Arc::clone(frame));
        }

        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.state.frames[frame_id.as_usize()];

        let mut data = [0u8; PAGE_SIZE];
        self.disk_scheduler.schedule_read_sync(page_id, &mut data)?;

        frame.set_page_id(page_id);
        frame.copy_from(&data);
        frame.set_dirty(false);
        frame.pin();

        inner.page_table.insert(page_id, frame_id);
        self.state.replacer.record_access(frame_id);
        self.state.replacer.set_evictable(frame_id, false);

        Ok(Arc::clone(frame))
    }

    /// Takes a frame off the free list, or evicts one. A dirty victim is
    /// written back before its frame is recycled.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = self.state.replacer.evict() else {
            return Err(QuarryError::BufferPoolFull);
        };

        let frame = &self.state.frames[frame_id.as_usize()];
        let victim_page_id = frame.page_id();

        if frame.is_dirty() {
            let mut data = [0u8; PAGE_SIZE];
            frame.copy_to(&mut data);
            self.disk_scheduler
                .schedule_write_sync(victim_page_id, &data)?;
        }
        trace!("evicting {} from {}", victim_page_id, frame_id);

        inner.page_table.remove(&victim_page_id);
        frame.reset();

        Ok(frame_id)
    }

    fn release_callback(&self) -> Box<dyn FnOnce(PageId, bool) + Send + Sync> {
        let state = Arc::clone(&self.state);
        Box::new(move |page_id, is_dirty| {
            state.unpin(page_id, is_dirty);
        })
    }
}
