//! Blacklist of failed tile keys.

use dashmap::DashSet;

use crate::tile::TileKey;

/// Concurrent set of keys that hard-failed and must not be re-queried
/// until the list is cleared (typically on layer reset).
///
/// Canceled or retry-flagged failures never land here; only genuine
/// source failures do.
#[derive(Debug, Default)]
pub struct Blacklist {
    keys: DashSet<TileKey>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, key: TileKey) {
        self.keys.insert(key);
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Profile;
    use std::sync::Arc;

    fn key(level: u32, x: u32, y: u32) -> TileKey {
        TileKey::new(level, x, y, Arc::new(Profile::global_geodetic()))
    }

    #[test]
    fn test_add_and_contains() {
        let bl = Blacklist::new();
        assert!(!bl.contains(&key(2, 1, 1)));
        bl.add(key(2, 1, 1));
        assert!(bl.contains(&key(2, 1, 1)));
        assert!(!bl.contains(&key(2, 1, 0)));
        assert_eq!(bl.len(), 1);
    }

    #[test]
    fn test_clear_resets() {
        let bl = Blacklist::new();
        bl.add(key(1, 0, 0));
        bl.add(key(1, 1, 0));
        assert_eq!(bl.len(), 2);
        bl.clear();
        assert!(bl.is_empty());
    }

    #[test]
    fn test_concurrent_add_contains() {
        let bl = Arc::new(Blacklist::new());
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let bl = Arc::clone(&bl);
                std::thread::spawn(move || {
                    for x in 0..16 {
                        bl.add(key(4, x, i));
                        assert!(bl.contains(&key(4, x, i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(bl.len(), 64);
    }
}
