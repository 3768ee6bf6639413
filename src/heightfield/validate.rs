//! Grid validation and no-data normalization.

use tracing::trace;

use super::grid::{HeightGrid, MAX_GRID_DIM, MIN_GRID_DIM};
use super::GridOp;
use crate::geo::{GeoExtent, Geoid};
use crate::NO_DATA;

/// Basic sanity check on a grid produced by a driver or decoded from a
/// cache blob: both dimensions within the legal range and storage length
/// consistent with them.
pub fn validate_height_grid(grid: &HeightGrid) -> bool {
    let (c, r) = (grid.columns(), grid.rows());
    if !(MIN_GRID_DIM..=MAX_GRID_DIM).contains(&c) {
        return false;
    }
    if !(MIN_GRID_DIM..=MAX_GRID_DIM).contains(&r) {
        return false;
    }
    grid.heights().len() == c as usize * r as usize
}

/// Rewrites invalid samples to the global [`NO_DATA`] sentinel.
///
/// A sample is invalid when it is NaN, equals the layer's configured
/// sentinel, or falls outside the layer's valid range. Applied to every
/// freshly fetched grid before it reaches any cache.
#[derive(Debug, Clone, Copy)]
pub struct NoDataNormalizer {
    no_data_value: f32,
    min_valid: f32,
    max_valid: f32,
}

impl NoDataNormalizer {
    pub fn new(no_data_value: f32, min_valid: f32, max_valid: f32) -> Self {
        Self {
            no_data_value,
            min_valid,
            max_valid,
        }
    }

    #[inline]
    fn is_invalid(&self, value: f32) -> bool {
        value.is_nan()
            || equivalent(value, self.no_data_value)
            || value < self.min_valid
            || value > self.max_valid
    }
}

impl GridOp for NoDataNormalizer {
    fn apply(&self, grid: &mut HeightGrid) {
        for value in grid.heights_mut() {
            if self.is_invalid(*value) {
                trace!(replaced = *value, "rewriting invalid sample to NO_DATA");
                *value = NO_DATA;
            }
        }
    }
}

#[inline]
fn equivalent(a: f32, b: f32) -> bool {
    a == b || (a - b).abs() <= b.abs() * 1e-6
}

/// Replaces every [`NO_DATA`] sample with sea level.
///
/// With a geoid, sea level is the geoid height at the sample's geodetic
/// location; without one it is 0 in the grid's datum. This implements
/// the MSL no-data policy.
pub fn resolve_invalid_heights(grid: &mut HeightGrid, extent: &GeoExtent, geoid: Option<&Geoid>) {
    let cols = grid.columns();
    let rows = grid.rows();
    let (xmin, ymin, _, _) = extent.bounds();
    let dx = extent.width() / (cols - 1).max(1) as f64;
    let dy = extent.height() / (rows - 1).max(1) as f64;

    for r in 0..rows {
        for c in 0..cols {
            if grid.get(c, r) != NO_DATA {
                continue;
            }
            let sea_level = match geoid {
                Some(g) => {
                    let x = xmin + dx * c as f64;
                    let y = ymin + dy * r as f64;
                    let (lon, lat) = extent.srs().to_geographic(x, y);
                    g.height_at(lon, lat)
                }
                None => 0.0,
            };
            grid.set(c, r, sea_level);
        }
    }
}
