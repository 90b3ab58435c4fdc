use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{MonitorError, Result};
use crate::types::{ArcLogEntry, LogEntry};

/// Sequence and bound, guarded together so a resize can never race a push
struct Inner {
    entries: VecDeque<ArcLogEntry>,
    capacity: usize,
}

impl Inner {
    fn evict_overflow(&mut self) -> u64 {
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }
}

/// Thread-safe bounded buffer for log entries with oldest-first eviction
#[derive(Clone)]
pub struct LogBuffer {
    /// Entries and capacity behind a single lock
    inner: Arc<RwLock<Inner>>,

    /// Next entry ID
    next_id: Arc<AtomicU64>,

    /// Entries dropped by eviction since creation or the last clear
    evicted: Arc<AtomicU64>,
}

impl LogBuffer {
    /// Create a new log buffer with the given capacity
    pub fn new(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(Inner {
                entries: VecDeque::with_capacity(capacity.min(4096)),
                capacity,
            })),
            next_id: Arc::new(AtomicU64::new(0)),
            evicted: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Push a new entry, evicting the oldest if at capacity.
    /// Returns the stored entry with its assigned ID.
    pub fn push(&self, mut entry: LogEntry) -> ArcLogEntry {
        let mut inner = self.inner.write();
        // Assigned under the write lock so IDs follow storage order
        entry.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(entry);

        if inner.entries.len() >= inner.capacity {
            inner.entries.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        inner.entries.push_back(Arc::clone(&entry));
        entry
    }

    /// Point-in-time copy of all entries, oldest first.
    /// Arc clones are cheap and the lock is released before returning.
    pub fn snapshot(&self) -> Vec<ArcLogEntry> {
        self.inner.read().entries.iter().cloned().collect()
    }

    /// Change the maximum number of entries, evicting the oldest on shrink
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        check_capacity(capacity)?;
        let mut inner = self.inner.write();
        inner.capacity = capacity;
        let evicted = inner.evict_overflow();
        self.evicted.fetch_add(evicted, Ordering::Relaxed);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity
    }

    /// Total entry count
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Number of entries dropped to honor the capacity
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Clear all entries
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        self.next_id.store(0, Ordering::SeqCst);
        self.evicted.store(0, Ordering::SeqCst);
    }
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(MonitorError::InvalidArgument(
            "maximum entry count must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
