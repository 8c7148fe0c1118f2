use std::fmt::Write;
use std::sync::Arc;

use log::{debug, trace};

use crate::buffer::{BufferPoolManager, WritePageGuard};
use crate::common::{PageId, QuarryError, RecordId, Result, INVALID_PAGE_ID};

use super::btree_iterator::TreeIterator;
use super::btree_page::{
    BTreePageType, HeaderPageMut, HeaderPageRef, InternalPageMut, InternalPageRef, LeafPageMut,
    LeafPageRef,
};

/// Latches held along a write descent: the header guard plus the chain of
/// ancestors from the first potentially-unsafe one down to the current node,
/// each paired with the child index the descent took. Everything is released
/// at once when a latched child turns out to be safe.
struct Context {
    header: Option<WritePageGuard>,
    path: Vec<(WritePageGuard, usize)>,
}

impl Context {
    fn new(header: WritePageGuard) -> Self {
        Self {
            header: Some(header),
            path: Vec::new(),
        }
    }

    fn release_all(&mut self) {
        self.path.clear();
        self.header = None;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WriteOp {
    Insert,
    Remove,
}

/// A concurrent B+ tree mapping u32 keys to record IDs, persisted as pages
/// owned by the buffer pool.
///
/// A header page pins down the root; readers crab shared latches down the
/// tree, writers hold exclusive latches from the first ancestor that might
/// split (or underflow) to the leaf. Leaves are chained left to right for
/// iteration.
pub struct BPlusTree {
    bpm: Arc<BufferPoolManager>,
    header_page_id: PageId,
    leaf_max_size: u16,
    internal_max_size: u16,
}

impl BPlusTree {
    /// Initializes a tree on a caller-allocated header page: the header is
    /// write-latched, a fresh empty leaf becomes the root, and its id is
    /// recorded in the header.
    pub fn new(
        bpm: Arc<BufferPoolManager>,
        header_page_id: PageId,
        leaf_max_size: u16,
        internal_max_size: u16,
    ) -> Result<Self> {
        let tree = Self {
            bpm,
            header_page_id,
            leaf_max_size,
            internal_max_size,
        };

        let mut header_guard = tree.bpm.fetch_page_write(header_page_id)?;

        let root_basic = tree.bpm.new_page_guarded()?;
        let root_id = root_basic.page_id();
        let mut root_guard = root_basic.upgrade_write();
        LeafPageMut::init(root_guard.data_mut(), tree.leaf_max_size);
        drop(root_guard);

        HeaderPageMut::init(header_guard.data_mut()).set_root_page_id(root_id);
        drop(header_guard);

        debug!("created b+ tree: header {}, root {}", header_page_id, root_id);
        Ok(tree)
    }

    /// Attaches to a tree persisted under an existing header page.
    pub fn open(
        bpm: Arc<BufferPoolManager>,
        header_page_id: PageId,
        leaf_max_size: u16,
        internal_max_size: u16,
    ) -> Result<Self> {
        let tree = Self {
            bpm,
            header_page_id,
            leaf_max_size,
            internal_max_size,
        };

        let header_guard = tree.bpm.fetch_page_read(header_page_id)?;
        let root_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        if root_id == INVALID_PAGE_ID {
            return Err(QuarryError::IndexCorrupted(
                "tree header has no root page".to_string(),
            ));
        }
        drop(header_guard);

        Ok(tree)
    }

    pub fn get_root_page_id(&self) -> Result<PageId> {
        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        Ok(HeaderPageRef::new(header_guard.data()).root_page_id())
    }

    pub fn is_empty(&self) -> Result<bool> {
        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        let root_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        let root_guard = self.bpm.fetch_page_read(root_id)?;
        drop(header_guard);

        Ok(match BTreePageType::of(root_guard.data()) {
            BTreePageType::Leaf => LeafPageRef::new(root_guard.data()).size() == 0,
            _ => false,
        })
    }

    /// Point lookup. Descends with shared latches, releasing each parent as
    /// soon as the child is latched.
    pub fn get_value(&self, key: u32) -> Result<Option<RecordId>> {
        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        let root_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        let mut guard = self.bpm.fetch_page_read(root_id)?;
        drop(header_guard);

        loop {
            match BTreePageType::of(guard.data()) {
                BTreePageType::Leaf => {
                    return Ok(LeafPageRef::new(guard.data()).lookup(key));
                }
                BTreePageType::Internal => {
                    let page = InternalPageRef::new(guard.data());
                    let child_id = page.child_at(page.child_index(key));
                    // Assignment latches the child before the parent drops
                    guard = self.bpm.fetch_page_read(child_id)?;
                }
                other => {
                    return Err(QuarryError::IndexCorrupted(format!(
                        "descent hit a {:?} page",
                        other
                    )));
                }
            }
        }
    }

    /// Unique-key insert. Returns false if the key is already present.
    pub fn insert(&self, key: u32, rid: RecordId) -> Result<bool> {
        let (mut ctx, mut guard) = self.find_leaf_write(key, WriteOp::Insert)?;

        if !LeafPageMut::new(guard.data_mut()).insert(key, rid) {
            return Ok(false);
        }

        let must_split = {
            let leaf = LeafPageRef::new(guard.data());
            leaf.size() >= leaf.max_size()
        };
        if !must_split {
            return Ok(true);
        }

        let sibling_basic = self.bpm.new_page_guarded()?;
        let sibling_id = sibling_basic.page_id();
        let mut sibling_guard = sibling_basic.upgrade_write();

        let separator = {
            let mut sibling = LeafPageMut::init(sibling_guard.data_mut(), self.leaf_max_size);
            let mut leaf = LeafPageMut::new(guard.data_mut());
            let separator = leaf.split_into(&mut sibling);
            sibling.set_next_page_id(leaf.next_page_id());
            leaf.set_next_page_id(sibling_id);
            separator
        };
        debug!(
            "leaf split: {} -> {} at key {}",
            guard.page_id(),
            sibling_id,
            separator
        );

        let left_id = guard.page_id();
        drop(sibling_guard);
        drop(guard);

        self.insert_separator(&mut ctx, left_id, separator, sibling_id)?;
        Ok(true)
    }

    /// Removes a key; absent keys are a no-op. Underflowing pages borrow
    /// from a sibling when one can spare an entry, and merge otherwise; an
    /// internal root left with a single child collapses into it.
    pub fn remove(&self, key: u32) -> Result<()> {
        let (mut ctx, mut guard) = self.find_leaf_write(key, WriteOp::Remove)?;

        if !LeafPageMut::new(guard.data_mut()).remove(key) {
            return Ok(());
        }

        let mut dead_pages: Vec<PageId> = Vec::new();
        let mut node_guard = guard;

        loop {
            let underflow = match BTreePageType::of(node_guard.data()) {
                BTreePageType::Leaf => {
                    let page = LeafPageRef::new(node_guard.data());
                    page.size() < page.min_size()
                }
                BTreePageType::Internal => {
                    let page = InternalPageRef::new(node_guard.data());
                    page.size() < page.min_size()
                }
                other => {
                    return Err(QuarryError::IndexCorrupted(format!(
                        "rebalance hit a {:?} page",
                        other
                    )));
                }
            };
            if !underflow {
                break;
            }

            match ctx.path.pop() {
                None => {
                    // The underflowing node is the root; only an internal
                    // root reduced to a single child collapses.
                    self.collapse_root(&mut ctx, &node_guard, &mut dead_pages);
                    break;
                }
                Some((mut parent_guard, child_idx)) => {
                    match BTreePageType::of(node_guard.data()) {
                        BTreePageType::Leaf => {
                            self.rebalance_leaf(
                                &mut parent_guard,
                                child_idx,
                                &mut node_guard,
                                &mut dead_pages,
                            )?;
                        }
                        _ => {
                            self.rebalance_internal(
                                &mut parent_guard,
                                child_idx,
                                &mut node_guard,
                                &mut dead_pages,
                            )?;
                        }
                    }
                    node_guard = parent_guard;
                }
            }
        }

        drop(node_guard);
        ctx.release_all();

        for page_id in dead_pages {
            // Best effort: a concurrent basic guard (e.g. an iterator) may
            // still pin the page even though the tree no longer links to it.
            match self.bpm.delete_page(page_id) {
                Err(QuarryError::PageStillPinned(_)) => {}
                other => {
                    other?;
                }
            }
        }

        Ok(())
    }

    /// Iterator over the whole tree, starting at the leftmost leaf.
    pub fn begin(&self) -> Result<TreeIterator> {
        if self.is_empty()? {
            return Ok(self.end());
        }
        let leaf_guard = self.find_leaf_read_leftmost()?;
        TreeIterator::at(Arc::clone(&self.bpm), leaf_guard, 0)
    }

    /// Iterator positioned at the first entry with key >= `key`.
    pub fn begin_at(&self, key: u32) -> Result<TreeIterator> {
        if self.is_empty()? {
            return Ok(self.end());
        }

        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        let root_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        let mut guard = self.bpm.fetch_page_read(root_id)?;
        drop(header_guard);

        loop {
            match BTreePageType::of(guard.data()) {
                BTreePageType::Leaf => {
                    let index = LeafPageRef::new(guard.data()).key_index(key);
                    let basic = self.bpm.fetch_page_basic(guard.page_id())?;
                    drop(guard);
                    return TreeIterator::at(Arc::clone(&self.bpm), basic, index);
                }
                BTreePageType::Internal => {
                    let page = InternalPageRef::new(guard.data());
                    let child_id = page.child_at(page.child_index(key));
                    guard = self.bpm.fetch_page_read(child_id)?;
                }
                other => {
                    return Err(QuarryError::IndexCorrupted(format!(
                        "descent hit a {:?} page",
                        other
                    )));
                }
            }
        }
    }

    /// The exhausted-iterator sentinel.
    pub fn end(&self) -> TreeIterator {
        TreeIterator::end(Arc::clone(&self.bpm))
    }

    /// Renders the tree as an indented textual dump, for tests and debugging.
    pub fn draw(&self) -> Result<String> {
        let mut out = String::new();
        let root_id = self.get_root_page_id()?;
        self.draw_page(root_id, 0, &mut out)?;
        Ok(out)
    }

    /// Prints [`draw`](Self::draw) to stdout.
    pub fn print(&self) -> Result<()> {
        println!("{}", self.draw()?);
        Ok(())
    }

    // -- write descent ------------------------------------------------------

    /// Descends to the leaf for `key` under exclusive latches, keeping the
    /// header guard and every ancestor that might be restructured.
    fn find_leaf_write(&self, key: u32, op: WriteOp) -> Result<(Context, WritePageGuard)> {
        let mut ctx = Context::new(self.bpm.fetch_page_write(self.header_page_id)?);
        let root_id =
            HeaderPageRef::new(ctx.header.as_ref().unwrap().data()).root_page_id();
        let mut guard = self.bpm.fetch_page_write(root_id)?;

        if Self::is_root_safe(op, guard.data()) {
            ctx.release_all();
        }

        loop {
            match BTreePageType::of(guard.data()) {
                BTreePageType::Leaf => return Ok((ctx, guard)),
                BTreePageType::Internal => {
                    let (child_idx, child_id) = {
                        let page = InternalPageRef::new(guard.data());
                        let idx = page.child_index(key);
                        (idx, page.child_at(idx))
                    };
                    let child_guard = self.bpm.fetch_page_write(child_id)?;
                    if Self::is_safe(op, child_guard.data()) {
                        ctx.release_all();
                    } else {
                        ctx.path.push((guard, child_idx));
                        guard = child_guard;
                        continue;
                    }
                    guard = child_guard;
                }
                other => {
                    return Err(QuarryError::IndexCorrupted(format!(
                        "descent hit a {:?} page",
                        other
                    )));
                }
            }
        }
    }

    /// A node is safe for an operation when it cannot propagate structural
    /// change to its parent. Leaves split on reaching max_size, internal
    /// pages one entry later.
    fn is_safe(op: WriteOp, data: &[u8]) -> bool {
        match (op, BTreePageType::of(data)) {
            (WriteOp::Insert, BTreePageType::Leaf) => {
                let p = LeafPageRef::new(data);
                p.size() + 1 < p.max_size()
            }
            (WriteOp::Insert, BTreePageType::Internal) => {
                let p = InternalPageRef::new(data);
                p.size() < p.max_size()
            }
            (WriteOp::Remove, BTreePageType::Leaf) => {
                let p = LeafPageRef::new(data);
                p.size() > p.min_size()
            }
            (WriteOp::Remove, BTreePageType::Internal) => {
                let p = InternalPageRef::new(data);
                p.size() > p.min_size()
            }
            _ => false,
        }
    }

    /// The root is exempt from the minimum-size rule; it only needs the
    /// header held when it might split or collapse.
    fn is_root_safe(op: WriteOp, data: &[u8]) -> bool {
        match op {
            WriteOp::Insert => Self::is_safe(op, data),
            WriteOp::Remove => match BTreePageType::of(data) {
                BTreePageType::Leaf => true,
                BTreePageType::Internal => InternalPageRef::new(data).size() > 2,
                _ => false,
            },
        }
    }

    // -- insert plumbing ----------------------------------------------------

    /// Walks a split separator up the held ancestor chain, splitting full
    /// internal pages along the way and growing a new root if the chain runs
    /// out.
    fn insert_separator(
        &self,
        ctx: &mut Context,
        mut left_id: PageId,
        mut separator: u32,
        mut right_id: PageId,
    ) -> Result<()> {
        loop {
            let Some((mut parent_guard, _)) = ctx.path.pop() else {
                let header_guard = ctx
                    .header
                    .as_mut()
                    .expect("root split must hold the header latch");

                let new_root_basic = self.bpm.new_page_guarded()?;
                let new_root_id = new_root_basic.page_id();
                let mut new_root_guard = new_root_basic.upgrade_write();
                InternalPageMut::init(new_root_guard.data_mut(), self.internal_max_size)
                    .populate_new_root(left_id, separator, right_id);
                drop(new_root_guard);

                HeaderPageMut::new(header_guard.data_mut()).set_root_page_id(new_root_id);
                debug!("root split: new root {}", new_root_id);
                return Ok(());
            };

            if !InternalPageMut::new(parent_guard.data_mut()).insert_child(separator, right_id) {
                return Err(QuarryError::IndexCorrupted(format!(
                    "separator {} already present in internal page {}",
                    separator,
                    parent_guard.page_id()
                )));
            }

            // Internal pages split one entry later than leaves: the extra
            // slot past max_size holds the overflow, and halving max_size+1
            // entries leaves both sides at or above min_size even when
            // max_size is odd.
            let must_split = {
                let page = InternalPageRef::new(parent_guard.data());
                page.size() > page.max_size()
            };
            if !must_split {
                return Ok(());
            }

            let sibling_basic = self.bpm.new_page_guarded()?;
            let sibling_id = sibling_basic.page_id();
            let mut sibling_guard = sibling_basic.upgrade_write();
            let carry = {
                let mut sibling =
                    InternalPageMut::init(sibling_guard.data_mut(), self.internal_max_size);
                let mut parent = InternalPageMut::new(parent_guard.data_mut());
                parent.split_into(&mut sibling)
            };
            debug!(
                "internal split: {} -> {} carrying key {}",
                parent_guard.page_id(),
                sibling_id,
                carry
            );

            left_id = parent_guard.page_id();
            separator = carry;
            right_id = sibling_id;
        }
    }

    // -- remove plumbing ----------------------------------------------------

    /// Repairs an underflowing leaf through its parent: borrow from the left
    /// sibling, then the right, then merge (left preferred).
    fn rebalance_leaf(
        &self,
        parent_guard: &mut WritePageGuard,
        child_idx: usize,
        node_guard: &mut WritePageGuard,
        dead_pages: &mut Vec<PageId>,
    ) -> Result<()> {
        let parent_size = InternalPageRef::new(parent_guard.data()).size();

        let mut left_guard = if child_idx > 0 {
            let left_id = InternalPageRef::new(parent_guard.data()).child_at(child_idx - 1);
            Some(self.bpm.fetch_page_write(left_id)?)
        } else {
            None
        };

        if let Some(lg) = left_guard.as_mut() {
            let can_spare = {
                let left = LeafPageRef::new(lg.data());
                left.size() > left.min_size()
            };
            if can_spare {
                let (key, rid) = LeafPageMut::new(lg.data_mut()).pop_back();
                LeafPageMut::new(node_guard.data_mut()).push_front(key, rid);
                InternalPageMut::new(parent_guard.data_mut()).set_key_at(child_idx, key);
                trace!("leaf {} borrowed key {} from left", node_guard.page_id(), key);
                return Ok(());
            }
        }

        let mut right_guard = if child_idx + 1 < parent_size {
            let right_id = InternalPageRef::new(parent_guard.data()).child_at(child_idx + 1);
            Some(self.bpm.fetch_page_write(right_id)?)
        } else {
            None
        };

        if let Some(rg) = right_guard.as_mut() {
            let can_spare = {
                let right = LeafPageRef::new(rg.data());
                right.size() > right.min_size()
            };
            if can_spare {
                let (key, rid) = LeafPageMut::new(rg.data_mut()).pop_front();
                LeafPageMut::new(node_guard.data_mut()).push_back(key, rid);
                let new_separator = LeafPageRef::new(rg.data()).key_at(0);
                InternalPageMut::new(parent_guard.data_mut())
                    .set_key_at(child_idx + 1, new_separator);
                trace!("leaf {} borrowed key {} from right", node_guard.page_id(), key);
                return Ok(());
            }
        }

        if let Some(mut lg) = left_guard {
            {
                let mut left = LeafPageMut::new(lg.data_mut());
                let mut node = LeafPageMut::new(node_guard.data_mut());
                left.merge_from_right(&mut node);
            }
            InternalPageMut::new(parent_guard.data_mut()).remove_at(child_idx);
            dead_pages.push(node_guard.page_id());
            trace!("leaf {} merged into left {}", node_guard.page_id(), lg.page_id());
            return Ok(());
        }

        if let Some(mut rg) = right_guard {
            {
                let mut node = LeafPageMut::new(node_guard.data_mut());
                let mut right = LeafPageMut::new(rg.data_mut());
                node.merge_from_right(&mut right);
            }
            InternalPageMut::new(parent_guard.data_mut()).remove_at(child_idx + 1);
            dead_pages.push(rg.page_id());
            trace!("leaf {} absorbed right {}", node_guard.page_id(), rg.page_id());
            return Ok(());
        }

        // No siblings: the parent is a single-child root about to collapse.
        Ok(())
    }

    /// Same repair for an underflowing internal node. Separators rotate
    /// through the parent on borrows and fold into the surviving page on
    /// merges.
    fn rebalance_internal(
        &self,
        parent_guard: &mut WritePageGuard,
        child_idx: usize,
        node_guard: &mut WritePageGuard,
        dead_pages: &mut Vec<PageId>,
    ) -> Result<()> {
        let parent_size = InternalPageRef::new(parent_guard.data()).size();

        let mut left_guard = if child_idx > 0 {
            let left_id = InternalPageRef::new(parent_guard.data()).child_at(child_idx - 1);
            Some(self.bpm.fetch_page_write(left_id)?)
        } else {
            None
        };

        if let Some(lg) = left_guard.as_mut() {
            let can_spare = {
                let left = InternalPageRef::new(lg.data());
                left.size() > left.min_size()
            };
            if can_spare {
                let (key, child) = InternalPageMut::new(lg.data_mut()).pop_back();
                let old_separator = InternalPageRef::new(parent_guard.data()).key_at(child_idx);
                InternalPageMut::new(node_guard.data_mut()).push_front(child, old_separator);
                InternalPageMut::new(parent_guard.data_mut()).set_key_at(child_idx, key);
                return Ok(());
            }
        }

        let mut right_guard = if child_idx + 1 < parent_size {
            let right_id = InternalPageRef::new(parent_guard.data()).child_at(child_idx + 1);
            Some(self.bpm.fetch_page_write(right_id)?)
        } else {
            None
        };

        if let Some(rg) = right_guard.as_mut() {
            let can_spare = {
                let right = InternalPageRef::new(rg.data());
                right.size() > right.min_size()
            };
            if can_spare {
                let (next_separator, child) = InternalPageMut::new(rg.data_mut()).pop_front();
                let old_separator =
                    InternalPageRef::new(parent_guard.data()).key_at(child_idx + 1);
                InternalPageMut::new(node_guard.data_mut()).push_back(old_separator, child);
                InternalPageMut::new(parent_guard.data_mut())
                    .set_key_at(child_idx + 1, next_separator);
                return Ok(());
            }
        }

        if let Some(mut lg) = left_guard {
            let separator = InternalPageRef::new(parent_guard.data()).key_at(child_idx);
            {
                let mut left = InternalPageMut::new(lg.data_mut());
                let mut node = InternalPageMut::new(node_guard.data_mut());
                left.merge_from_right(separator, &mut node);
            }
            InternalPageMut::new(parent_guard.data_mut()).remove_at(child_idx);
            dead_pages.push(node_guard.page_id());
            return Ok(());
        }

        if let Some(mut rg) = right_guard {
            let separator = InternalPageRef::new(parent_guard.data()).key_at(child_idx + 1);
            {
                let mut node = InternalPageMut::new(node_guard.data_mut());
                let mut right = InternalPageMut::new(rg.data_mut());
                node.merge_from_right(separator, &mut right);
            }
            InternalPageMut::new(parent_guard.data_mut()).remove_at(child_idx + 1);
            dead_pages.push(rg.page_id());
            return Ok(());
        }

        Ok(())
    }

    /// Promotes the sole child of a shrunken internal root.
    fn collapse_root(
        &self,
        ctx: &mut Context,
        root_guard: &WritePageGuard,
        dead_pages: &mut Vec<PageId>,
    ) {
        if BTreePageType::of(root_guard.data()) != BTreePageType::Internal {
            return;
        }
        let root = InternalPageRef::new(root_guard.data());
        if root.size() != 1 {
            return;
        }

        let new_root_id = root.child_at(0);
        let header_guard = ctx
            .header
            .as_mut()
            .expect("root collapse must hold the header latch");
        HeaderPageMut::new(header_guard.data_mut()).set_root_page_id(new_root_id);
        dead_pages.push(root_guard.page_id());
        debug!("root collapse: {} -> {}", root_guard.page_id(), new_root_id);
    }

    // -- read helpers -------------------------------------------------------

    /// Crabs down the leftmost spine and returns a basic guard on the first
    /// leaf.
    fn find_leaf_read_leftmost(&self) -> Result<crate::buffer::PageGuard> {
        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        let root_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        let mut guard = self.bpm.fetch_page_read(root_id)?;
        drop(header_guard);

        loop {
            match BTreePageType::of(guard.data()) {
                BTreePageType::Leaf => {
                    let basic = self.bpm.fetch_page_basic(guard.page_id())?;
                    return Ok(basic);
                }
                BTreePageType::Internal => {
                    let child_id = InternalPageRef::new(guard.data()).child_at(0);
                    guard = self.bpm.fetch_page_read(child_id)?;
                }
                other => {
                    return Err(QuarryError::IndexCorrupted(format!(
                        "descent hit a {:?} page",
                        other
                    )));
                }
            }
        }
    }

    fn draw_page(&self, page_id: PageId, depth: usize, out: &mut String) -> Result<()> {
        enum Node {
            Leaf { keys: Vec<u32>, next: PageId },
            Internal { keys: Vec<u32>, children: Vec<PageId> },
        }

        let guard = self.bpm.fetch_page_basic(page_id)?;
        let node = guard.with_data(|data| match BTreePageType::of(data) {
            BTreePageType::Leaf => {
                let leaf = LeafPageRef::new(data);
                Ok(Node::Leaf {
                    keys: (0..leaf.size()).map(|i| leaf.key_at(i)).collect(),
                    next: leaf.next_page_id(),
                })
            }
            BTreePageType::Internal => {
                let page = InternalPageRef::new(data);
                Ok(Node::Internal {
                    keys: (1..page.size()).map(|i| page.key_at(i)).collect(),
                    children: (0..page.size()).map(|i| page.child_at(i)).collect(),
                })
            }
            other => Err(QuarryError::IndexCorrupted(format!(
                "draw hit a {:?} page",
                other
            ))),
        })?;
        drop(guard);

        let indent = "  ".repeat(depth);
        match node {
            Node::Leaf { keys, next } => {
                writeln!(out, "{}leaf {} next={}: {:?}", indent, page_id, next, keys)
                    .expect("string formatting");
            }
            Node::Internal { keys, children } => {
                writeln!(out, "{}internal {}: seps {:?}", indent, page_id, keys)
                    .expect("string formatting");
                for child in children {
                    self.draw_page(child, depth + 1, out)?;
                }
            }
        }
        Ok(())
    }
}
