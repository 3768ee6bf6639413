//! Persistent cache bins.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::codec;
use crate::cache::types::CacheError;
use crate::heightfield::HeightGrid;
use crate::progress::Progress;

/// Outcome of a bin read: an optional decoded grid plus the entry's
/// last-modified time for expiry checks.
#[derive(Debug, Default)]
pub struct ReadResult {
    grid: Option<HeightGrid>,
    last_modified: Option<SystemTime>,
}

impl ReadResult {
    pub fn hit(grid: HeightGrid, last_modified: Option<SystemTime>) -> Self {
        Self {
            grid: Some(grid),
            last_modified,
        }
    }

    pub fn miss() -> Self {
        Self::default()
    }

    pub fn succeeded(&self) -> bool {
        self.grid.is_some()
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    pub fn take_grid(self) -> Option<HeightGrid> {
        self.grid
    }
}

/// Blob store keyed by string, the persistent tier behind each layer.
///
/// Implementations are expected to be thread-safe; the core calls them
/// from whatever task is synthesizing a tile.
pub trait CacheBin: Send + Sync {
    fn read(&self, key: &str, progress: Option<&dyn Progress>) -> ReadResult;

    fn write(
        &self,
        key: &str,
        grid: &HeightGrid,
        progress: Option<&dyn Progress>,
    ) -> Result<(), CacheError>;
}

/// File-per-key cache bin rooted at a directory.
pub struct FileBin {
    dir: PathBuf,
}

impl FileBin {
    /// Open (creating if needed) a bin rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys carry '/' (tile path) and '|' (profile signature);
        // flatten into a single file name.
        let name: String = key
            .chars()
            .map(|c| if c == '/' || c == '|' { '-' } else { c })
            .collect();
        self.dir.join(format!("{name}.thg"))
    }
}

impl CacheBin for FileBin {
    fn read(&self, key: &str, _progress: Option<&dyn Progress>) -> ReadResult {
        let path = self.path_for(key);
        let Ok(blob) = fs::read(&path) else {
            return ReadResult::miss();
        };
        match codec::decode(&blob) {
            Ok(grid) => {
                let mtime = fs::metadata(&path).ok().and_then(|m| m.modified().ok());
                ReadResult::hit(grid, mtime)
            }
            Err(e) => {
                debug!(key, error = %e, "discarding undecodable cache entry");
                ReadResult::miss()
            }
        }
    }

    fn write(
        &self,
        key: &str,
        grid: &HeightGrid,
        _progress: Option<&dyn Progress>,
    ) -> Result<(), CacheError> {
        let path = self.path_for(key);
        fs::write(path, codec::encode(grid))?;
        Ok(())
    }
}

/// In-memory cache bin. Backs tests and cache-only layers that are
/// seeded programmatically.
#[derive(Default)]
pub struct MemBin {
    entries: Mutex<HashMap<String, (Vec<u8>, SystemTime)>>,
}

impl MemBin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backdate an entry, for exercising expiry paths.
    pub fn set_last_modified(&self, key: &str, when: SystemTime) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.1 = when;
        }
    }
}

impl CacheBin for MemBin {
    fn read(&self, key: &str, _progress: Option<&dyn Progress>) -> ReadResult {
        let entries = self.entries.lock();
        let Some((blob, mtime)) = entries.get(key) else {
            return ReadResult::miss();
        };
        match codec::decode(blob) {
            Ok(grid) => ReadResult::hit(grid, Some(*mtime)),
            Err(_) => ReadResult::miss(),
        }
    }

    fn write(
        &self,
        key: &str,
        grid: &HeightGrid,
        _progress: Option<&dyn Progress>,
    ) -> Result<(), CacheError> {
        self.entries
            .lock()
            .insert(key.to_string(), (codec::encode(grid), SystemTime::now()));
        Ok(())
    }
}
