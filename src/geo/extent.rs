//! Geographic extents.

use super::srs::Srs;

/// Axis-aligned rectangle of earth surface in a given SRS.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoExtent {
    srs: Srs,
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl GeoExtent {
    pub fn new(srs: Srs, xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            srs,
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn srs(&self) -> &Srs {
        &self.srs
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.xmin, self.ymin, self.xmax, self.ymax)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.xmin + self.xmax) * 0.5,
            (self.ymin + self.ymax) * 0.5,
        )
    }

    pub fn is_valid(&self) -> bool {
        self.xmin.is_finite()
            && self.ymin.is_finite()
            && self.xmax.is_finite()
            && self.ymax.is_finite()
            && self.xmax > self.xmin
            && self.ymax > self.ymin
    }

    /// Inclusive containment test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// True if the two extents overlap by more than an edge.
    pub fn intersects(&self, other: &GeoExtent) -> bool {
        self.xmin < other.xmax
            && self.xmax > other.xmin
            && self.ymin < other.ymax
            && self.ymax > other.ymin
    }

    /// Intersection of two extents in the same SRS.
    pub fn intersection(&self, other: &GeoExtent) -> Option<GeoExtent> {
        if !self.intersects(other) {
            return None;
        }
        Some(GeoExtent::new(
            self.srs.clone(),
            self.xmin.max(other.xmin),
            self.ymin.max(other.ymin),
            self.xmax.min(other.xmax),
            self.ymax.min(other.ymax),
        ))
    }

    /// Reproject this extent into another SRS by transforming its
    /// corners and taking the bounding box.
    pub fn transform(&self, to: &Srs) -> Option<GeoExtent> {
        if self.srs.is_horiz_equivalent_to(to) {
            let mut out = self.clone();
            out.srs = to.clone();
            return Some(out);
        }

        let corners = [
            (self.xmin, self.ymin),
            (self.xmin, self.ymax),
            (self.xmax, self.ymin),
            (self.xmax, self.ymax),
        ];
        let mut xmin = f64::INFINITY;
        let mut ymin = f64::INFINITY;
        let mut xmax = f64::NEG_INFINITY;
        let mut ymax = f64::NEG_INFINITY;
        for (x, y) in corners {
            let (tx, ty) = self.srs.transform_2d(x, y, to)?;
            xmin = xmin.min(tx);
            ymin = ymin.min(ty);
            xmax = xmax.max(tx);
            ymax = ymax.max(ty);
        }
        let out = GeoExtent::new(to.clone(), xmin, ymin, xmax, ymax);
        out.is_valid().then_some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whole_world() -> GeoExtent {
        GeoExtent::new(Srs::wgs84(), -180.0, -90.0, 180.0, 90.0)
    }

    #[test]
    fn test_dimensions() {
        let e = whole_world();
        assert_eq!(e.width(), 360.0);
        assert_eq!(e.height(), 180.0);
        assert_eq!(e.center(), (0.0, 0.0));
        assert!(e.is_valid());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let e = whole_world();
        assert!(e.contains(-180.0, -90.0));
        assert!(e.contains(180.0, 90.0));
        assert!(!e.contains(180.1, 0.0));
    }

    #[test]
    fn test_intersection() {
        let a = GeoExtent::new(Srs::wgs84(), 0.0, 0.0, 10.0, 10.0);
        let b = GeoExtent::new(Srs::wgs84(), 5.0, 5.0, 20.0, 20.0);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i.bounds(), (5.0, 5.0, 10.0, 10.0));

        let c = GeoExtent::new(Srs::wgs84(), 10.0, 10.0, 20.0, 20.0);
        assert!(a.intersection(&c).is_none()); // edge touch is not overlap
    }

    #[test]
    fn test_transform_to_mercator_and_back() {
        let e = GeoExtent::new(Srs::wgs84(), -90.0, -45.0, 90.0, 45.0);
        let m = e.transform(&Srs::spherical_mercator()).unwrap();
        assert!(m.is_valid());

        let back = m.transform(&Srs::wgs84()).unwrap();
        assert!((back.xmin() - -90.0).abs() < 1e-6);
        assert!((back.ymax() - 45.0).abs() < 1e-6);
    }
}
