use std::sync::Arc;

use crate::buffer::{BufferPoolManager, PageGuard};
use crate::common::{PageId, RecordId, Result, INVALID_PAGE_ID};

use super::btree_page::LeafPageRef;

/// Forward iterator over a tree's leaf chain.
///
/// Holds a basic (pin-only) guard on the current leaf and an entry index;
/// crossing a leaf boundary swaps the guard for the next leaf's. It takes no
/// leaf latches beyond the per-access ones of the basic guard, so callers
/// must serialize against concurrent mutation or accept reading a moving
/// target.
pub struct TreeIterator {
    bpm: Arc<BufferPoolManager>,
    guard: Option<PageGuard>,
    index: usize,
}

impl TreeIterator {
    /// The exhausted sentinel.
    pub(crate) fn end(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            bpm,
            guard: None,
            index: 0,
        }
    }

    /// Iterator resting on `index` within the given leaf, normalized past
    /// any exhausted leaves.
    pub(crate) fn at(bpm: Arc<BufferPoolManager>, guard: PageGuard, index: usize) -> Result<Self> {
        let mut iter = Self {
            bpm,
            guard: Some(guard),
            index,
        };
        iter.normalize()?;
        Ok(iter)
    }

    pub fn is_end(&self) -> bool {
        self.guard.is_none()
    }

    /// Yields the current entry and advances.
    pub fn next_entry(&mut self) -> Result<Option<(u32, RecordId)>> {
        let Some(guard) = self.guard.as_ref() else {
            return Ok(None);
        };

        let entry = guard.with_data(|data| {
            let leaf = LeafPageRef::new(data);
            (leaf.key_at(self.index), leaf.rid_at(self.index))
        });
        self.index += 1;
        self.normalize()?;

        Ok(Some(entry))
    }

    /// Hops leaves until the cursor rests on a live entry or the chain ends.
    fn normalize(&mut self) -> Result<()> {
        while let Some(guard) = self.guard.as_ref() {
            let (size, next) = guard.with_data(|data| {
                let leaf = LeafPageRef::new(data);
                (leaf.size(), leaf.next_page_id())
            });

            if self.index < size {
                return Ok(());
            }
            if next == INVALID_PAGE_ID {
                self.guard = None;
                self.index = 0;
                return Ok(());
            }

            match self.bpm.fetch_page_basic(next) {
                Ok(next_guard) => {
                    self.guard = Some(next_guard);
                    self.index = 0;
                }
                Err(e) => {
                    self.guard = None;
                    self.index = 0;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn current_page_id(&self) -> PageId {
        self.guard
            .as_ref()
            .map(|g| g.page_id())
            .unwrap_or(INVALID_PAGE_ID)
    }
}

impl Iterator for TreeIterator {
    type Item = Result<(u32, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl PartialEq for TreeIterator {
    fn eq(&self, other: &Self) -> bool {
        self.current_page_id() == other.current_page_id() && self.index == other.index
    }
}

impl Eq for TreeIterator {}
