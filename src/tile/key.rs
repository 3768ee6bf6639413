//! Tile keys.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::profile::Profile;
use crate::geo::GeoExtent;

/// Identifies one tile of a pyramid: level of detail, column, row, and
/// the profile that defines the pyramid. x runs west to east, y north
/// to south.
#[derive(Debug, Clone)]
pub struct TileKey {
    level: u32,
    x: u32,
    y: u32,
    profile: Arc<Profile>,
}

impl TileKey {
    pub fn new(level: u32, x: u32, y: u32, profile: Arc<Profile>) -> Self {
        Self {
            level,
            x,
            y,
            profile,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn profile(&self) -> &Arc<Profile> {
        &self.profile
    }

    /// True when (x, y) addresses a tile that exists at this level.
    pub fn is_valid(&self) -> bool {
        let (nx, ny) = self.profile.num_tiles(self.level);
        self.x < nx && self.y < ny
    }

    /// String form used in cache keys: `level/x/y`.
    pub fn str_key(&self) -> String {
        format!("{}/{}/{}", self.level, self.x, self.y)
    }

    pub fn extent(&self) -> GeoExtent {
        self.profile.tile_extent(self.level, self.x, self.y)
    }

    /// The containing tile one level up, or `None` at the root.
    pub fn parent(&self) -> Option<TileKey> {
        if self.level == 0 {
            return None;
        }
        Some(TileKey::new(
            self.level - 1,
            self.x >> 1,
            self.y >> 1,
            Arc::clone(&self.profile),
        ))
    }

    /// The containing tile at `level`, which must not exceed this key's
    /// level.
    pub fn ancestor(&self, level: u32) -> TileKey {
        debug_assert!(level <= self.level);
        let delta = self.level - level;
        TileKey::new(
            level,
            self.x >> delta,
            self.y >> delta,
            Arc::clone(&self.profile),
        )
    }

    /// The tile `dx` columns east and `dy` rows south of this one.
    /// Columns wrap around the antimeridian; rows off the pyramid edge
    /// yield `None`.
    pub fn neighbor(&self, dx: i32, dy: i32) -> Option<TileKey> {
        let (nx, ny) = self.profile.num_tiles(self.level);
        let x = (self.x as i64 + dx as i64).rem_euclid(nx as i64) as u32;
        let y = self.y as i64 + dy as i64;
        if y < 0 || y >= ny as i64 {
            return None;
        }
        Some(TileKey::new(self.level, x, y as u32, Arc::clone(&self.profile)))
    }

    /// Map this key to the level whose tiles, sampled at `source_size`,
    /// best match a caller grid of `target_size` samples.
    ///
    /// When the source tile carries more samples than the target wants,
    /// each halving of the surplus moves one level up the pyramid, so
    /// the returned ancestor key covers the target at roughly the
    /// requested resolution.
    pub fn map_resolution(&self, target_size: u32, source_size: u32) -> TileKey {
        if self.level == 0 || target_size >= source_size {
            return self.clone();
        }

        let mut level = self.level;
        let mut size = target_size.max(2).next_power_of_two();
        while size < source_size && level > 0 {
            level -= 1;
            size *= 2;
        }
        self.ancestor(level)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}

impl PartialEq for TileKey {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
            && self.x == other.x
            && self.y == other.y
            && self.profile.full_signature() == other.profile.full_signature()
    }
}

impl Eq for TileKey {}

impl Hash for TileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.x.hash(state);
        self.y.hash(state);
        self.profile.full_signature().hash(state);
    }
}
