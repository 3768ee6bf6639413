//! Height grids, normal maps, and georeferenced sampling.

mod geo;
mod grid;
mod normal_map;
mod validate;

pub use geo::{sort_by_resolution_descending, GeoHeightField};
pub use grid::{GridError, HeightGrid, MAX_GRID_DIM, MIN_GRID_DIM};
pub use normal_map::NormalMap;
pub use validate::{resolve_invalid_heights, validate_height_grid, NoDataNormalizer};

/// Operation applied to a freshly produced height grid.
///
/// Drivers run the layer's pre-cache normalizer through this trait so
/// that invalid samples are rewritten before the grid reaches any cache.
pub trait GridOp: Send + Sync {
    fn apply(&self, grid: &mut HeightGrid);
}

/// Sampling mode for reading heights at arbitrary locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Weighted average of the four surrounding samples. The result is
    /// `NO_DATA` unless all four are valid.
    #[default]
    Bilinear,
    /// Value of the nearest sample.
    Nearest,
}
