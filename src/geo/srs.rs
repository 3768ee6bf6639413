//! Horizontal spatial reference systems.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use super::vdatum::VerticalDatum;

/// Latitude bound of the spherical Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.05112878;

/// Half-extent of the spherical Mercator plane, in meters.
pub const MERCATOR_BOUND: f64 = 20_037_508.342789244;

/// Reference ellipsoid for a spatial reference system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    equatorial_radius: f64,
    polar_radius: f64,
}

impl Ellipsoid {
    /// WGS84 ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid {
        equatorial_radius: 6_378_137.0,
        polar_radius: 6_356_752.314245,
    };

    pub fn radius_equator(&self) -> f64 {
        self.equatorial_radius
    }

    pub fn radius_polar(&self) -> f64 {
        self.polar_radius
    }
}

/// Horizontal coordinate system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizSrs {
    /// WGS84 geodetic coordinates, degrees of longitude/latitude.
    Geographic,
    /// Spherical (web) Mercator, meters.
    SphericalMercator,
}

impl HorizSrs {
    pub fn name(&self) -> &'static str {
        match self {
            HorizSrs::Geographic => "wgs84",
            HorizSrs::SphericalMercator => "spherical-mercator",
        }
    }
}

/// A spatial reference system: a horizontal system plus an optional
/// vertical datum.
///
/// A missing vertical datum means heights are ellipsoidal (HAE). The
/// vertical datum rides along on extents and profiles so that sampled
/// heights can be shifted into the requester's datum at read time.
#[derive(Clone)]
pub struct Srs {
    horiz: HorizSrs,
    vdatum: Option<Arc<VerticalDatum>>,
}

impl Srs {
    /// WGS84 geodetic SRS with ellipsoidal heights.
    pub fn wgs84() -> Self {
        Self {
            horiz: HorizSrs::Geographic,
            vdatum: None,
        }
    }

    /// Spherical Mercator SRS with ellipsoidal heights.
    pub fn spherical_mercator() -> Self {
        Self {
            horiz: HorizSrs::SphericalMercator,
            vdatum: None,
        }
    }

    /// Attach a vertical datum to this SRS.
    pub fn with_vertical_datum(mut self, vdatum: Arc<VerticalDatum>) -> Self {
        self.vdatum = Some(vdatum);
        self
    }

    pub fn horiz(&self) -> HorizSrs {
        self.horiz
    }

    pub fn is_geographic(&self) -> bool {
        self.horiz == HorizSrs::Geographic
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &Ellipsoid::WGS84
    }

    pub fn vertical_datum(&self) -> Option<&Arc<VerticalDatum>> {
        self.vdatum.as_ref()
    }

    /// Short name used in profile signatures.
    pub fn name(&self) -> &'static str {
        self.horiz.name()
    }

    /// Name of the vertical datum, `"hae"` when heights are ellipsoidal.
    pub fn vdatum_name(&self) -> &str {
        self.vdatum.as_ref().map_or("hae", |v| v.name())
    }

    /// True if both systems use the same horizontal coordinates,
    /// regardless of vertical datum.
    pub fn is_horiz_equivalent_to(&self, other: &Srs) -> bool {
        self.horiz == other.horiz
    }

    /// True if both systems reference heights to the same datum.
    pub fn is_vert_equivalent_to(&self, other: &Srs) -> bool {
        self.vdatum_name() == other.vdatum_name()
    }

    /// Transform a 2D point from this SRS into `to`.
    ///
    /// Returns `None` when the point cannot be represented in the target
    /// system (e.g. polar latitudes in Mercator).
    pub fn transform_2d(&self, x: f64, y: f64, to: &Srs) -> Option<(f64, f64)> {
        match (self.horiz, to.horiz) {
            (HorizSrs::Geographic, HorizSrs::SphericalMercator) => geo_to_mercator(x, y),
            (HorizSrs::SphericalMercator, HorizSrs::Geographic) => Some(mercator_to_geo(x, y)),
            _ => Some((x, y)),
        }
    }

    /// Transform a 2D point in this SRS to geodetic degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        match self.horiz {
            HorizSrs::Geographic => (x, y),
            HorizSrs::SphericalMercator => mercator_to_geo(x, y),
        }
    }
}

impl fmt::Debug for Srs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Srs")
            .field("horiz", &self.horiz)
            .field("vdatum", &self.vdatum_name())
            .finish()
    }
}

impl PartialEq for Srs {
    fn eq(&self, other: &Self) -> bool {
        self.horiz == other.horiz && self.vdatum_name() == other.vdatum_name()
    }
}

fn geo_to_mercator(lon: f64, lat: f64) -> Option<(f64, f64)> {
    if !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let r = Ellipsoid::WGS84.radius_equator();
    let x = lon.to_radians() * r;
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * r;
    Some((x, y))
}

fn mercator_to_geo(x: f64, y: f64) -> (f64, f64) {
    let r = Ellipsoid::WGS84.radius_equator();
    let lon = (x / r).to_degrees();
    let lat = (2.0 * (y / r).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}
