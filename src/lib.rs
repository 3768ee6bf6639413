//! TerraLayer - elevation compositing for tiled terrain pyramids
//!
//! This library produces regular grids of surface heights (and matching
//! normal maps) for tiles of a terrain pyramid, by querying an ordered
//! stack of elevation sources, caching and blacklisting per layer,
//! reprojecting across tile profiles, and blending additive "offset"
//! layers on top of base layers.
//!
//! # High-Level API
//!
//! The [`composite::LayerStack`] is the main entry point: configure one
//! [`layer::ElevationLayer`] per source, push them onto a stack (last
//! pushed wins ties), and populate a pre-allocated grid:
//!
//! ```ignore
//! use terralayer::composite::LayerStack;
//! use terralayer::heightfield::{HeightGrid, Interpolation, NormalMap};
//! use terralayer::layer::{ElevationLayer, ElevationLayerOptions};
//!
//! let mut stack = LayerStack::new();
//! stack.push(std::sync::Arc::new(dem_layer));
//!
//! let mut hf = HeightGrid::filled(257, 257, terralayer::NO_DATA);
//! let mut normals = NormalMap::new(257, 257);
//! let ok = stack.populate(&mut hf, Some(&mut normals), &key, None,
//!                         Interpolation::Bilinear, None);
//! ```
//!
//! Tile source drivers, persistent cache backends and vertical-datum
//! models plug in through the narrow traits in [`source`], [`cache`]
//! and [`geo`].

pub mod cache;
pub mod composite;
pub mod geo;
pub mod heightfield;
pub mod layer;
pub mod progress;
pub mod source;
pub mod tile;

/// Version of the TerraLayer library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Global sentinel marking an absent elevation sample.
///
/// Every invalid sample (NaN, per-layer sentinel, out of the valid range)
/// is rewritten to this value before it reaches a cache or the
/// compositor.
pub const NO_DATA: f32 = -f32::MAX;
