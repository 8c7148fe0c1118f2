use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::common::{PageId, QuarryError, Result, PAGE_SIZE};

use super::DiskManager;

/// A disk I/O request handed to the scheduler's worker thread.
///
/// Buffers are passed as raw pointers; the submitting thread blocks on the
/// completion channel until the worker is done with them, so the pointee
/// outlives the request.
enum DiskRequest {
    Read {
        page_id: PageId,
        data: *mut u8,
        done: std::sync::mpsc::Sender<bool>,
    },
    Write {
        page_id: PageId,
        data: *const u8,
        done: std::sync::mpsc::Sender<bool>,
    },
    Shutdown,
}

// Safety: the buffer pointers stay valid until the completion channel is
// signalled, and only the worker thread dereferences them.
unsafe impl Send for DiskRequest {}

/// DiskScheduler owns a background worker thread that serializes disk I/O.
/// Callers submit requests and block until the worker signals completion.
pub struct DiskScheduler {
    disk_manager: Arc<DiskManager>,
    request_sender: Sender<DiskRequest>,
    worker_handle: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Creates a new DiskScheduler and spawns its worker thread.
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver) = bounded::<DiskRequest>(128);

        let dm = Arc::clone(&disk_manager);
        let worker_handle = thread::spawn(move || {
            Self::run_worker(dm, receiver);
        });

        Self {
            disk_manager,
            request_sender: sender,
            worker_handle: Some(worker_handle),
        }
    }

    /// Reads a page, blocking until the worker completes the request.
    pub fn schedule_read_sync(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let (tx, rx) = std::sync::mpsc::channel();
        self.submit(DiskRequest::Read {
            page_id,
            data: data.as_mut_ptr(),
            done: tx,
        })?;
        Self::await_completion(rx, page_id)
    }

    /// Writes a page, blocking until the worker completes the request.
    pub fn schedule_write_sync(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let (tx, rx) = std::sync::mpsc::channel();
        self.submit(DiskRequest::Write {
            page_id,
            data: data.as_ptr(),
            done: tx,
        })?;
        Self::await_completion(rx, page_id)
    }

    fn submit(&self, request: DiskRequest) -> Result<()> {
        self.request_sender
            .send(request)
            .map_err(|e| QuarryError::DiskScheduler(format!("failed to submit request: {}", e)))
    }

    fn await_completion(rx: std::sync::mpsc::Receiver<bool>, page_id: PageId) -> Result<()> {
        let ok = rx.recv().map_err(|e| {
            QuarryError::DiskScheduler(format!("failed to receive completion: {}", e))
        })?;
        if !ok {
            return Err(QuarryError::DiskScheduler(format!(
                "I/O request for {} failed",
                page_id
            )));
        }
        Ok(())
    }

    /// Worker loop: drains the request queue until a shutdown message.
    fn run_worker(disk_manager: Arc<DiskManager>, receiver: Receiver<DiskRequest>) {
        while let Ok(request) = receiver.recv() {
            match request {
                DiskRequest::Read {
                    page_id,
                    data,
                    done,
                } => {
                    // Safety: see DiskRequest - pointer valid until `done` fires
                    let buf = unsafe { std::slice::from_raw_parts_mut(data, PAGE_SIZE) };
                    let ok = disk_manager.read_page(page_id, buf).is_ok();
                    let _ = done.send(ok);
                }
                DiskRequest::Write {
                    page_id,
                    data,
                    done,
                } => {
                    // Safety: see DiskRequest - pointer valid until `done` fires
                    let buf = unsafe { std::slice::from_raw_parts(data, PAGE_SIZE) };
                    let ok = disk_manager.write_page(page_id, buf).is_ok();
                    let _ = done.send(ok);
                }
                DiskRequest::Shutdown => break,
            }
        }
    }

    /// Returns a reference to the underlying DiskManager.
    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        let _ = self.request_sender.send(DiskRequest::Shutdown);
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_disk_scheduler_read_write() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let scheduler = DiskScheduler::new(dm);

        let page_id = PageId::new(0);

        let mut write_data = [0u8; PAGE_SIZE];
        write_data[0] = 42;
        write_data[100] = 255;
        scheduler.schedule_write_sync(page_id, &write_data).unwrap();

        let mut read_data = [0u8; PAGE_SIZE];
        scheduler
            .schedule_read_sync(page_id, &mut read_data)
            .unwrap();

        assert_eq!(read_data[0], 42);
        assert_eq!(read_data[100], 255);
    }

    #[test]
    fn test_disk_scheduler_multiple_requests() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let scheduler = DiskScheduler::new(dm);

        let data1 = [1u8; PAGE_SIZE];
        let data2 = [2u8; PAGE_SIZE];

        scheduler
            .schedule_write_sync(PageId::new(0), &data1)
            .unwrap();
        scheduler
            .schedule_write_sync(PageId::new(1), &data2)
            .unwrap();

        let mut read1 = [0u8; PAGE_SIZE];
        let mut read2 = [0u8; PAGE_SIZE];

        scheduler
            .schedule_read_sync(PageId::new(0), &mut read1)
            .unwrap();
        scheduler
            .schedule_read_sync(PageId::new(1), &mut read2)
            .unwrap();

        assert_eq!(read1[0], 1);
        assert_eq!(read2[0], 2);
    }

    #[test]
    fn test_disk_scheduler_shutdown_on_drop() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let scheduler = DiskScheduler::new(dm);

        let data = [9u8; PAGE_SIZE];
        scheduler
            .schedule_write_sync(PageId::new(0), &data)
            .unwrap();
        drop(scheduler); // joins the worker
    }
}
