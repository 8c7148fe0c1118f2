use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, PAGE_SIZE};

use super::FrameHeader;

/// Callback invoked exactly once when a guard releases its pin.
/// Arguments: the guarded page id and whether the guard dirtied the page.
type ReleaseCallback = Box<dyn FnOnce(PageId, bool) + Send + Sync>;

/// Common guard state: the pinned frame and the one-shot release callback.
struct PageGuardBase {
    page_id: PageId,
    /// Kept alive for the guard's lifetime; also the latch target.
    frame: Arc<FrameHeader>,
    release_callback: Option<ReleaseCallback>,
    is_dirty: bool,
}

impl PageGuardBase {
    fn new(page_id: PageId, frame: Arc<FrameHeader>, release_callback: ReleaseCallback) -> Self {
        Self {
            page_id,
            frame,
            release_callback: Some(release_callback),
            is_dirty: false,
        }
    }

    fn release(&mut self) {
        if let Some(callback) = self.release_callback.take() {
            callback(self.page_id, self.is_dirty);
        }
    }
}

/// RAII guard holding only a pin on a page - no latch.
///
/// Byte access goes through short-lived per-call latches, so a basic guard
/// never blocks other guards for longer than a single access. Dropping the
/// guard unpins the page, carrying the dirty flag if the guard wrote to it.
pub struct PageGuard {
    base: PageGuardBase,
}

impl PageGuard {
    pub(crate) fn new(
        page_id: PageId,
        frame: Arc<FrameHeader>,
        release_callback: ReleaseCallback,
    ) -> Self {
        Self {
            base: PageGuardBase::new(page_id, frame, release_callback),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.base.page_id
    }

    /// Marks the page dirty without writing through this guard.
    pub fn set_dirty(&mut self) {
        self.base.is_dirty = true;
    }

    /// Runs `f` over the page bytes under a transient shared latch.
    pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let guard = self.base.frame.data.read();
        f(&guard[..])
    }

    /// Runs `f` over the page bytes under a transient exclusive latch and
    /// marks the page dirty.
    pub fn with_data_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        self.base.is_dirty = true;
        let mut guard = self.base.frame.data.write();
        f(&mut guard[..])
    }

    /// Converts this guard into a write guard without releasing the pin.
    pub fn upgrade_write(mut self) -> WritePageGuard {
        let page_id = self.base.page_id;
        let frame = Arc::clone(&self.base.frame);
        let callback = self
            .base
            .release_callback
            .take()
            .expect("guard already released");
        let was_dirty = self.base.is_dirty;

        let mut guard = unsafe { WritePageGuard::new(page_id, frame, callback) };
        guard.base.is_dirty = was_dirty;
        guard
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.base.release();
    }
}

/// RAII guard for shared read access to a page.
/// Holds the pin and the frame's shared latch; drop releases the latch
/// first, then unpins.
pub struct ReadPageGuard {
    base: PageGuardBase,
    /// Shared latch on the page bytes
    data_guard: Option<RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl ReadPageGuard {
    /// # Safety
    /// The latch guard is transmuted to 'static; the frame it points into is
    /// kept alive by the Arc stored alongside it, and the latch is dropped
    /// before that Arc.
    pub(crate) unsafe fn new(
        page_id: PageId,
        frame: Arc<FrameHeader>,
        release_callback: ReleaseCallback,
    ) -> Self {
        let data_guard = frame.data.read();
        let data_guard: RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>> =
            std::mem::transmute(data_guard);

        Self {
            base: PageGuardBase::new(page_id, frame, release_callback),
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.base.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }
}

impl Deref for ReadPageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        // Release the latch before unpinning so an evictor never waits on us
        self.data_guard.take();
        self.base.release();
    }
}

/// RAII guard for exclusive write access to a page.
/// Holds the pin and the frame's exclusive latch; any mutable access marks
/// the page dirty. Drop releases the latch first, then unpins.
pub struct WritePageGuard {
    base: PageGuardBase,
    /// Exclusive latch on the page bytes
    data_guard: Option<RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl WritePageGuard {
    /// # Safety
    /// See [`ReadPageGuard::new`].
    pub(crate) unsafe fn new(
        page_id: PageId,
        frame: Arc<FrameHeader>,
        release_callback: ReleaseCallback,
    ) -> Self {
        let data_guard = frame.data.write();
        let data_guard: RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>> =
            std::mem::transmute(data_guard);

        Self {
            base: PageGuardBase::new(page_id, frame, release_callback),
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.base.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }

    /// Returns the page bytes mutably and marks the page dirty.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.base.is_dirty = true;
        &mut self.data_guard.as_mut().unwrap()[..]
    }
}

impl Deref for WritePageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl DerefMut for WritePageGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data_mut()
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        self.data_guard.take();
        self.base.release();
    }
}
