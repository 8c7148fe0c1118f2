pub mod btree;
pub mod btree_iterator;
pub mod btree_page;

pub use btree::BPlusTree;
pub use btree_iterator::TreeIterator;
pub use btree_page::{
    BTreePageType, HeaderPageMut, HeaderPageRef, InternalPageMut, InternalPageRef, LeafPageMut,
    LeafPageRef, INTERNAL_PAGE_CAPACITY, LEAF_PAGE_CAPACITY,
};
