//! Bounded in-process cache of decoded height grids.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::heightfield::HeightGrid;

struct Entry {
    grid: Arc<HeightGrid>,
    last_used: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    tick: u64,
}

/// Small per-layer LRU cache of decoded grids, keyed by the same string
/// as the persistent tier. Grids are shared out as `Arc`s, so a hit
/// costs a clone of the pointer, not the samples.
pub struct MemoryCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` grids.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<Arc<HeightGrid>> {
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(Arc::clone(&entry.grid))
    }

    pub fn put(&self, key: impl Into<String>, grid: Arc<HeightGrid>) {
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(key.into(), Entry { grid, last_used: tick });

        while inner.entries.len() > self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    inner.entries.remove(&k);
                }
                None => break,
            }
        }
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }
}
