use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::common::{FrameId, Timestamp};

/// Tracks access history for a single frame
#[derive(Debug)]
struct FrameAccessInfo {
    /// History of access timestamps (most recent at back), at most k entries
    history: VecDeque<Timestamp>,
    /// Whether this frame is currently evictable
    is_evictable: bool,
}

impl FrameAccessInfo {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            is_evictable: false,
        }
    }

    fn record_access(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance from the current timestamp.
    /// None encodes +inf (fewer than k recorded accesses).
    fn k_distance(&self, current_timestamp: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(current_timestamp - self.history[self.history.len() - k])
        }
    }

    fn earliest_timestamp(&self) -> Option<Timestamp> {
        self.history.front().copied()
    }
}

#[derive(Debug, Default)]
struct ReplacerInner {
    frame_info: HashMap<FrameId, FrameAccessInfo>,
    num_evictable: usize,
}

/// LRU-K replacement policy.
///
/// Evicts the evictable frame whose backward k-distance is largest, where
/// the distance is the gap between the current timestamp and the timestamp
/// of the kth most recent access. Frames with fewer than k accesses have
/// +inf distance and are preferred; ties among them break toward the frame
/// with the earliest recorded access.
pub struct LruKReplacer {
    /// K value for the LRU-K algorithm
    k: usize,
    /// Maximum number of frames the replacer can track
    max_frames: usize,
    /// Current timestamp (monotonically increasing)
    current_timestamp: AtomicU64,
    inner: Mutex<ReplacerInner>,
}

impl LruKReplacer {
    /// Creates a new LRU-K replacer with the given k value and frame count.
    pub fn new(k: usize, max_frames: usize) -> Self {
        assert!(k > 0, "LRU-K requires k >= 1");
        Self {
            k,
            max_frames,
            current_timestamp: AtomicU64::new(0),
            inner: Mutex::new(ReplacerInner::default()),
        }
    }

    /// Evicts the frame with the largest backward k-distance and erases its
    /// history. Returns None when no frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();

        if inner.num_evictable == 0 {
            return None;
        }

        let current_ts = self.current_timestamp.load(Ordering::Relaxed);

        let mut victim: Option<FrameId> = None;
        let mut victim_k_dist: Option<Timestamp> = None;
        let mut victim_earliest_ts: Option<Timestamp> = None;

        for (frame_id, info) in inner.frame_info.iter() {
            if !info.is_evictable {
                continue;
            }

            let k_dist = info.k_distance(current_ts, self.k);
            let earliest_ts = info.earliest_timestamp();

            let should_replace = match (victim_k_dist, k_dist) {
                // Victim is +inf, candidate is finite
                (None, Some(_)) => false,
                // Victim is finite, candidate is +inf
                (Some(_), None) => true,
                // Both +inf: earlier first access wins
                (None, None) => match (victim_earliest_ts, earliest_ts) {
                    (Some(v_ts), Some(c_ts)) => c_ts < v_ts,
                    (None, Some(_)) => true,
                    _ => false,
                },
                // Both finite: larger distance wins
                (Some(v_dist), Some(c_dist)) => c_dist > v_dist,
            };

            if victim.is_none() || should_replace {
                victim = Some(*frame_id);
                victim_k_dist = k_dist;
                victim_earliest_ts = earliest_ts;
            }
        }

        if let Some(frame_id) = victim {
            inner.frame_info.remove(&frame_id);
            inner.num_evictable -= 1;
        }

        victim
    }

    /// Records an access to the given frame at the next timestamp, creating
    /// the frame's history on first contact. Evictability is unaffected.
    pub fn record_access(&self, frame_id: FrameId) {
        if frame_id.as_usize() >= self.max_frames {
            return;
        }

        let timestamp = self.current_timestamp.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock();

        inner
            .frame_info
            .entry(frame_id)
            .or_insert_with(FrameAccessInfo::new)
            .record_access(timestamp, self.k);
    }

    /// Sets whether a frame may be evicted. No-op on unknown frames and on
    /// an unchanged flag.
    pub fn set_evictable(&self, frame_id: FrameId, is_evictable: bool) {
        if frame_id.as_usize() >= self.max_frames {
            return;
        }

        let inner = &mut *self.inner.lock();

        if let Some(info) = inner.frame_info.get_mut(&frame_id) {
            if info.is_evictable != is_evictable {
                info.is_evictable = is_evictable;
                if is_evictable {
                    inner.num_evictable += 1;
                } else {
                    inner.num_evictable -= 1;
                }
            }
        }
    }

    /// Removes a frame from the replacer entirely. The frame must be
    /// evictable; removing a pinned frame is a caller bug. Unknown frames
    /// are ignored.
    pub fn remove(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();

        if let Some(info) = inner.frame_info.remove(&frame_id) {
            assert!(
                info.is_evictable,
                "remove() called on non-evictable frame {}",
                frame_id
            );
            inner.num_evictable -= 1;
        }
    }

    /// Returns the number of evictable frames.
    pub fn size(&self) -> usize {
        self.inner.lock().num_evictable
    }

    /// Returns the k value of this replacer.
    pub fn k(&self) -> usize {
        self.k
    }
}
