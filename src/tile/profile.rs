//! Tile pyramid profiles.

use std::f64::consts::PI;
use std::sync::Arc;

use super::key::TileKey;
use crate::geo::{GeoExtent, Srs, VerticalDatum, MERCATOR_BOUND};

/// A tile pyramid: a horizontal SRS, a vertical datum (carried on the
/// SRS), and the pyramid geometry (full extent plus the level-0 tile
/// grid). Tile y runs north to south, matching slippy-map convention.
#[derive(Debug, Clone)]
pub struct Profile {
    srs: Srs,
    extent: GeoExtent,
    base_tiles_x: u32,
    base_tiles_y: u32,
    signature: String,
}

impl Profile {
    /// Global geodetic profile: 2x1 tiles at level 0 over the whole
    /// earth in WGS84 degrees.
    pub fn global_geodetic() -> Self {
        Self::from_parts(Srs::wgs84(), -180.0, -90.0, 180.0, 90.0, 2, 1)
    }

    /// Spherical Mercator profile: a single level-0 tile over the
    /// square Mercator plane.
    pub fn spherical_mercator() -> Self {
        Self::from_parts(
            Srs::spherical_mercator(),
            -MERCATOR_BOUND,
            -MERCATOR_BOUND,
            MERCATOR_BOUND,
            MERCATOR_BOUND,
            1,
            1,
        )
    }

    /// Custom profile over an arbitrary extent and level-0 tile grid.
    pub fn new(
        srs: Srs,
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        base_tiles_x: u32,
        base_tiles_y: u32,
    ) -> Self {
        Self::from_parts(srs, xmin, ymin, xmax, ymax, base_tiles_x, base_tiles_y)
    }

    fn from_parts(
        srs: Srs,
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        base_tiles_x: u32,
        base_tiles_y: u32,
    ) -> Self {
        let extent = GeoExtent::new(srs.clone(), xmin, ymin, xmax, ymax);
        let signature = format!(
            "{}|{}|{}x{}|{:.0},{:.0},{:.0},{:.0}",
            srs.name(),
            srs.vdatum_name(),
            base_tiles_x,
            base_tiles_y,
            xmin,
            ymin,
            xmax,
            ymax
        );
        Self {
            srs,
            extent,
            base_tiles_x,
            base_tiles_y,
            signature,
        }
    }

    /// Rebuild this profile with a vertical datum attached.
    pub fn with_vertical_datum(&self, vdatum: Arc<VerticalDatum>) -> Self {
        let (xmin, ymin, xmax, ymax) = self.extent.bounds();
        Self::from_parts(
            self.srs.clone().with_vertical_datum(vdatum),
            xmin,
            ymin,
            xmax,
            ymax,
            self.base_tiles_x,
            self.base_tiles_y,
        )
    }

    pub fn srs(&self) -> &Srs {
        &self.srs
    }

    pub fn extent(&self) -> &GeoExtent {
        &self.extent
    }

    /// Stable identifier including the vertical datum; distinct profiles
    /// have distinct signatures, which keeps cache keys collision-free.
    pub fn full_signature(&self) -> &str {
        &self.signature
    }

    /// Tile grid dimensions at a level.
    pub fn num_tiles(&self, level: u32) -> (u32, u32) {
        (self.base_tiles_x << level, self.base_tiles_y << level)
    }

    /// Extent of one tile.
    pub fn tile_extent(&self, level: u32, x: u32, y: u32) -> GeoExtent {
        let (nx, ny) = self.num_tiles(level);
        let tw = self.extent.width() / nx as f64;
        let th = self.extent.height() / ny as f64;
        let xmin = self.extent.xmin() + tw * x as f64;
        let ymax = self.extent.ymax() - th * y as f64;
        GeoExtent::new(self.srs.clone(), xmin, ymax - th, xmin + tw, ymax)
    }

    /// True when both profiles tile the same horizontal space the same
    /// way, regardless of vertical datum.
    pub fn is_horiz_equivalent_to(&self, other: &Profile) -> bool {
        self.srs.is_horiz_equivalent_to(&other.srs)
            && self.base_tiles_x == other.base_tiles_x
            && self.base_tiles_y == other.base_tiles_y
            && self.extent.bounds() == other.extent.bounds()
    }

    /// Tile width at a level expressed in meters at the equator, the
    /// common yardstick for matching resolutions across profiles.
    fn tile_width_equator_m(&self, level: u32) -> f64 {
        let (nx, _) = self.num_tiles(level);
        let w = self.extent.width() / nx as f64;
        if self.srs.is_geographic() {
            let m_per_deg = 2.0 * PI * self.srs.ellipsoid().radius_equator() / 360.0;
            w * m_per_deg
        } else {
            w
        }
    }

    /// Level in this profile whose tiles most closely match the ground
    /// resolution of `foreign` at `foreign_level`.
    pub fn equivalent_level(&self, foreign: &Profile, foreign_level: u32) -> u32 {
        let target = foreign.tile_width_equator_m(foreign_level);
        let ratio = self.tile_width_equator_m(0) / target;
        if ratio <= 1.0 {
            return 0;
        }
        ratio.log2().round().clamp(0.0, 30.0) as u32
    }

    /// Tiles of this profile intersecting a foreign key's extent, at the
    /// resolution-equivalent level.
    ///
    /// Returns an empty vector when the foreign extent cannot be
    /// represented in, or does not overlap, this profile.
    pub fn intersecting_tiles(&self, key: &TileKey) -> Vec<TileKey> {
        let level = self.equivalent_level(key.profile(), key.level());

        let Some(foreign) = key.extent().transform(&self.srs) else {
            return Vec::new();
        };
        let Some(overlap) = foreign.intersection(&self.extent) else {
            return Vec::new();
        };

        let (nx, ny) = self.num_tiles(level);
        let tw = self.extent.width() / nx as f64;
        let th = self.extent.height() / ny as f64;

        let x0 = (((overlap.xmin() - self.extent.xmin()) / tw).floor() as i64).clamp(0, nx as i64 - 1);
        let x1 = ((((overlap.xmax() - self.extent.xmin()) / tw).ceil() as i64) - 1).clamp(x0, nx as i64 - 1);
        // Tile y counts down from the profile's north edge.
        let y0 = (((self.extent.ymax() - overlap.ymax()) / th).floor() as i64).clamp(0, ny as i64 - 1);
        let y1 = ((((self.extent.ymax() - overlap.ymin()) / th).ceil() as i64) - 1).clamp(y0, ny as i64 - 1);

        // Keys compare by signature, so handing out a fresh handle to
        // an identical profile is sound.
        let profile = Arc::new(self.clone());
        let mut keys = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for y in y0..=y1 {
            for x in x0..=x1 {
                keys.push(TileKey::new(level, x as u32, y as u32, Arc::clone(&profile)));
            }
        }
        keys
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}
