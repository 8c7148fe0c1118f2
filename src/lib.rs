//! Quarry - the storage-engine core of a disk-oriented database
//!
//! This crate implements the caching and indexing layers a relational
//! database builds on: pages live on disk, a buffer pool keeps a bounded
//! working set of them in memory, and a B+ tree index orders records on top
//! of those pages.
//!
//! # Architecture
//!
//! - **Storage layer** (`storage`): raw page I/O
//!   - `DiskManager`: reads and writes 4 KB pages in a single database file
//!   - `DiskScheduler`: background worker thread serializing disk requests
//!
//! - **Buffer pool** (`buffer`): bounded in-memory page cache
//!   - `BufferPoolManager`: page table, free list, pin/unpin protocol
//!   - `LruKReplacer`: LRU-K eviction policy over unpinned frames
//!   - `FrameHeader`: per-frame metadata plus the page bytes and their latch
//!   - `PageGuard` / `ReadPageGuard` / `WritePageGuard`: RAII pins, the
//!     latter two also holding the frame latch
//!
//! - **Index** (`index`): ordered access
//!   - `BPlusTree`: concurrent B+ tree with latch crabbing and a header
//!     page anchoring the root
//!   - `TreeIterator`: forward scan across the leaf chain
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quarry::buffer::BufferPoolManager;
//! use quarry::common::{PageId, RecordId, SlotId};
//! use quarry::index::BPlusTree;
//! use quarry::storage::disk::DiskManager;
//!
//! let disk_manager = Arc::new(DiskManager::new("example.db").unwrap());
//! let bpm = Arc::new(BufferPoolManager::new(64, 2, disk_manager));
//!
//! let header_page_id = bpm.new_page().unwrap();
//! bpm.unpin_page(header_page_id, false);
//!
//! let tree = BPlusTree::new(Arc::clone(&bpm), header_page_id, 64, 64).unwrap();
//! tree.insert(42, RecordId::new(PageId::new(7), SlotId::new(0))).unwrap();
//! assert!(tree.get_value(42).unwrap().is_some());
//!
//! bpm.flush_all_pages().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{PageId, QuarryError, RecordId, Result, SlotId};
