//! Integration tests for the disk manager

use quarry::common::{PageId, PAGE_SIZE};
use quarry::storage::disk::DiskManager;

#[test]
fn test_disk_manager_write_read_cycle() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("cycle.db");
    let dm = DiskManager::new(&db_path).unwrap();

    for i in 0..8u32 {
        let mut data = [0u8; PAGE_SIZE];
        data[0] = i as u8;
        data[PAGE_SIZE - 1] = (i * 2) as u8;
        dm.write_page(PageId::new(i), &data).unwrap();
    }

    for i in 0..8u32 {
        let mut data = [0u8; PAGE_SIZE];
        dm.read_page(PageId::new(i), &mut data).unwrap();
        assert_eq!(data[0], i as u8);
        assert_eq!(data[PAGE_SIZE - 1], (i * 2) as u8);
    }

    assert_eq!(dm.num_pages(), 8);
    assert_eq!(dm.num_writes(), 8);
    assert_eq!(dm.num_reads(), 8);
}

#[test]
fn test_disk_manager_unwritten_page_reads_zeroed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("zero.db");
    let dm = DiskManager::new(&db_path).unwrap();

    let mut data = [0xFFu8; PAGE_SIZE];
    dm.read_page(PageId::new(3), &mut data).unwrap();
    assert!(data.iter().all(|&b| b == 0));
}

#[test]
fn test_disk_manager_reopen_sees_pages() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("reopen.db");

    {
        let dm = DiskManager::new(&db_path).unwrap();
        let mut data = [0u8; PAGE_SIZE];
        data[10] = 77;
        dm.write_page(PageId::new(2), &data).unwrap();
        dm.sync().unwrap();
    }

    {
        let dm = DiskManager::new(&db_path).unwrap();
        assert_eq!(dm.num_pages(), 3);

        let mut data = [0u8; PAGE_SIZE];
        dm.read_page(PageId::new(2), &mut data).unwrap();
        assert_eq!(data[10], 77);
    }
}
