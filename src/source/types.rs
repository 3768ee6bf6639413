//! Driver trait and errors.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use super::blacklist::Blacklist;
use crate::heightfield::{GridOp, HeightGrid};
use crate::progress::Progress;
use crate::tile::TileKey;

/// Errors surfaced by tile source drivers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Driver could not produce the tile (I/O, network, decode).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Driver has no data for the requested tile.
    #[error("no data for tile {0}")]
    NoData(String),
}

/// A driver producing raw height grids for keys in the layer's profile.
///
/// Drivers run the supplied pre-cache op over each produced grid before
/// returning it, so no un-normalized sample ever escapes. Blocking I/O
/// inside `create_height_grid` is fine; the core is caller-threaded and
/// polls its [`Progress`] around the call.
pub trait TileSource: Send + Sync {
    /// Driver name for logs and diagnostics.
    fn name(&self) -> &str;

    /// False when the driver failed to initialize; the layer then
    /// refuses to synthesize.
    fn is_ok(&self) -> bool {
        true
    }

    /// Produce the grid for `key`, running `op` over it first.
    fn create_height_grid(
        &self,
        key: &TileKey,
        op: Option<&dyn GridOp>,
        progress: Option<&dyn Progress>,
    ) -> Result<HeightGrid, SourceError>;

    /// Cheap pre-check: false when the driver knows it has nothing at
    /// `key`, saving a fetch.
    fn may_have_data(&self, _key: &TileKey) -> bool {
        true
    }

    /// Deepest level the driver carries data for.
    fn max_data_level(&self) -> u32 {
        30
    }

    /// Keys that hard-failed for this driver.
    fn blacklist(&self) -> &Blacklist;
}

/// Tile source backed by an in-memory key-to-grid table.
///
/// Doubles as the synthesis seam: a layer that computes its grids
/// procedurally registers them here (or implements [`TileSource`]
/// directly) instead of carrying a driver. Tiles are addressed
/// horizontally, by (level, x, y) — like a real driver, the table does
/// not care which vertical datum the requesting pyramid carries.
pub struct MemorySource {
    name: String,
    grids: RwLock<HashMap<(u32, u32, u32), HeightGrid>>,
    max_data_level: u32,
    blacklist: Blacklist,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grids: RwLock::new(HashMap::new()),
            max_data_level: 30,
            blacklist: Blacklist::new(),
        }
    }

    /// Limit the deepest level this source reports data for.
    pub fn with_max_data_level(mut self, level: u32) -> Self {
        self.max_data_level = level;
        self
    }

    /// Register the grid served for `key`'s (level, x, y).
    pub fn insert(&self, key: TileKey, grid: HeightGrid) {
        self.grids
            .write()
            .insert((key.level(), key.x(), key.y()), grid);
    }

    pub fn len(&self) -> usize {
        self.grids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TileSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_height_grid(
        &self,
        key: &TileKey,
        op: Option<&dyn GridOp>,
        _progress: Option<&dyn Progress>,
    ) -> Result<HeightGrid, SourceError> {
        let mut grid = self
            .grids
            .read()
            .get(&(key.level(), key.x(), key.y()))
            .cloned()
            .ok_or_else(|| SourceError::NoData(key.str_key()))?;
        if let Some(op) = op {
            op.apply(&mut grid);
        }
        Ok(grid)
    }

    fn may_have_data(&self, key: &TileKey) -> bool {
        key.level() <= self.max_data_level
    }

    fn max_data_level(&self) -> u32 {
        self.max_data_level
    }

    fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }
}
