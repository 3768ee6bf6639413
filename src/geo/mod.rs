//! Spatial reference plumbing.
//!
//! Provides the two horizontal reference systems the tile pyramids use
//! (geodetic WGS84 and spherical Mercator), geographic extents, and the
//! vertical-datum model (ellipsoidal heights vs geoid-referenced mean
//! sea level).

mod extent;
mod srs;
mod vdatum;

pub use extent::GeoExtent;
pub use srs::{Ellipsoid, HorizSrs, Srs, MAX_MERCATOR_LAT, MERCATOR_BOUND};
pub use vdatum::{Geoid, GeoidSurface, VerticalDatum};
