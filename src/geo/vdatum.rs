//! Vertical datums and geoid surfaces.
//!
//! Heights are either ellipsoidal (HAE, the absence of a datum) or
//! referenced to a named datum whose geoid gives the offset between the
//! ellipsoid and mean sea level at each location. Cached grids always
//! hold heights in their source's native datum; the transforms here
//! shift them into the requester's datum on read.

use std::fmt;
use std::sync::Arc;

use super::extent::GeoExtent;
use crate::heightfield::HeightGrid;
use crate::NO_DATA;

/// Scalar offset field between the ellipsoid and mean sea level.
pub trait GeoidSurface: Send + Sync {
    /// Geoid height (meters above the ellipsoid) at geodetic (lon, lat).
    fn height_at(&self, lon: f64, lat: f64) -> f32;
}

struct ConstantSurface(f32);

impl GeoidSurface for ConstantSurface {
    fn height_at(&self, _lon: f64, _lat: f64) -> f32 {
        self.0
    }
}

/// A geoid model: a named [`GeoidSurface`].
#[derive(Clone)]
pub struct Geoid {
    name: String,
    surface: Arc<dyn GeoidSurface>,
}

impl Geoid {
    pub fn new(name: impl Into<String>, surface: Arc<dyn GeoidSurface>) -> Self {
        Self {
            name: name.into(),
            surface,
        }
    }

    /// Geoid with the same offset everywhere. Mostly useful in tests and
    /// as a stand-in for coarse models.
    pub fn constant(name: impl Into<String>, height: f32) -> Self {
        Self::new(name, Arc::new(ConstantSurface(height)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height_at(&self, lon: f64, lat: f64) -> f32 {
        self.surface.height_at(lon, lat)
    }
}

impl fmt::Debug for Geoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geoid").field("name", &self.name).finish()
    }
}

/// A named vertical datum, optionally backed by a geoid.
///
/// Two datums with the same name are equivalent. A datum without a geoid
/// behaves as a zero-offset reference.
#[derive(Debug, Clone)]
pub struct VerticalDatum {
    name: String,
    geoid: Option<Geoid>,
}

impl VerticalDatum {
    pub fn new(name: impl Into<String>, geoid: Option<Geoid>) -> Self {
        Self {
            name: name.into(),
            geoid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geoid(&self) -> Option<&Geoid> {
        self.geoid.as_ref()
    }

    fn offset_at(datum: Option<&VerticalDatum>, lon: f64, lat: f64) -> f32 {
        datum
            .and_then(|d| d.geoid.as_ref())
            .map_or(0.0, |g| g.height_at(lon, lat))
    }

    /// Shift a single height sample from one datum into another at the
    /// given geodetic location. `None` means HAE. `NO_DATA` passes
    /// through untouched.
    pub fn transform_height(
        from: Option<&VerticalDatum>,
        to: Option<&VerticalDatum>,
        lon: f64,
        lat: f64,
        height: f32,
    ) -> f32 {
        if height == NO_DATA || Self::equivalent(from, to) {
            return height;
        }
        let g_from = Self::offset_at(from, lon, lat);
        let g_to = Self::offset_at(to, lon, lat);
        height + g_from - g_to
    }

    /// Shift every sample of a grid from one datum into another,
    /// in place. Sample locations are derived from `extent` and the grid
    /// dimensions; `NO_DATA` samples pass through untouched.
    pub fn transform_grid(
        from: Option<&VerticalDatum>,
        to: Option<&VerticalDatum>,
        extent: &GeoExtent,
        grid: &mut HeightGrid,
    ) {
        if Self::equivalent(from, to) {
            return;
        }

        let cols = grid.columns();
        let rows = grid.rows();
        let (xmin, ymin, _, _) = extent.bounds();
        let dx = extent.width() / (cols - 1).max(1) as f64;
        let dy = extent.height() / (rows - 1).max(1) as f64;

        for r in 0..rows {
            let y = ymin + dy * r as f64;
            for c in 0..cols {
                let x = xmin + dx * c as f64;
                let (lon, lat) = extent.srs().to_geographic(x, y);
                let h = grid.get(c, r);
                grid.set(c, r, Self::transform_height(from, to, lon, lat, h));
            }
        }
    }

    fn equivalent(a: Option<&VerticalDatum>, b: Option<&VerticalDatum>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl PartialEq for VerticalDatum {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
