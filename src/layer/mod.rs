//! Elevation layers: configuration plus single-layer tile synthesis.

mod elevation;
mod options;
mod status;

pub use elevation::ElevationLayer;
pub use options::{ElevationLayerOptions, NoDataPolicy};
pub use status::LayerStatus;

use crate::heightfield::GeoHeightField;
use crate::progress::Progress;
use crate::tile::TileKey;

/// The elevation-layer capability the compositor works against.
///
/// The layer stack owns handles to this trait, not concrete types, so
/// synthetic and driver-backed layers mix freely.
pub trait Layer: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn is_visible(&self) -> bool;

    /// True when this layer's samples add onto the resolved base
    /// instead of replacing it.
    fn is_offset(&self) -> bool;

    /// Samples per tile edge this layer's source produces.
    fn tile_size(&self) -> u32;

    /// True when `key`'s level falls inside the layer's configured
    /// min/max range.
    fn is_key_in_legal_range(&self, key: &TileKey) -> bool;

    /// The deepest key at or above `key` the layer can actually serve,
    /// or `None` when it has nothing there at all.
    fn best_available_tile_key(&self, key: &TileKey) -> Option<TileKey>;

    /// Synthesize the layer's height field for `key`.
    fn create_height_field(
        &self,
        key: &TileKey,
        progress: Option<&dyn Progress>,
    ) -> Option<GeoHeightField>;
}
