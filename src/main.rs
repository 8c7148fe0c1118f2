use std::io::Write;
use std::sync::Arc;

use env_logger::Builder;
use quarry::buffer::BufferPoolManager;
use quarry::common::{PageId, RecordId, SlotId};
use quarry::index::BPlusTree;
use quarry::storage::disk::DiskManager;

fn init_log() {
    let mut builder = Builder::from_default_env();
    builder
        .format_timestamp_secs()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}:{}] {}",
                record.level(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init()
        .ok();
}

fn main() {
    init_log();

    println!("Quarry - storage engine core demo");
    println!("=================================\n");

    let db_path = "demo.db";

    let disk_manager = Arc::new(DiskManager::new(db_path).expect("Failed to create disk manager"));
    println!("Opened database file: {}", db_path);

    let bpm = Arc::new(BufferPoolManager::new(16, 2, disk_manager));
    println!("Created buffer pool with 16 frames\n");

    let header_page_id = bpm.new_page().expect("Failed to allocate header page");
    bpm.unpin_page(header_page_id, false);

    let tree = BPlusTree::new(Arc::clone(&bpm), header_page_id, 4, 4)
        .expect("Failed to create B+ tree");

    for key in [17u32, 3, 25, 8, 1, 30, 12, 21, 5, 28] {
        let rid = RecordId::new(PageId::new(key), SlotId::new(0));
        tree.insert(key, rid).expect("insert failed");
    }
    println!("Inserted 10 keys; tree layout:\n");
    tree.print().expect("draw failed");

    print!("Forward scan from key 8: ");
    let keys: Vec<u32> = tree
        .begin_at(8)
        .expect("begin failed")
        .map(|entry| entry.expect("scan failed").0)
        .collect();
    println!("{:?}", keys);

    tree.remove(8).expect("remove failed");
    tree.remove(12).expect("remove failed");
    println!("\nAfter removing 8 and 12:\n");
    tree.print().expect("draw failed");

    bpm.flush_all_pages().expect("flush failed");
    println!("Flushed all pages to disk");

    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
}
