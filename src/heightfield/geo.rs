//! Georeferenced height fields.

use std::sync::Arc;

use super::grid::HeightGrid;
use super::Interpolation;
use crate::geo::{GeoExtent, Srs, VerticalDatum};
use crate::NO_DATA;

/// A height grid anchored to a geographic extent.
///
/// Sampling transforms the query point into the grid's SRS, reads the
/// grid, then shifts the sampled height from the grid's vertical datum
/// into the requester's.
#[derive(Debug, Clone)]
pub struct GeoHeightField {
    grid: Arc<HeightGrid>,
    extent: GeoExtent,
}

impl GeoHeightField {
    pub fn new(grid: Arc<HeightGrid>, extent: GeoExtent) -> Self {
        Self { grid, extent }
    }

    pub fn grid(&self) -> &Arc<HeightGrid> {
        &self.grid
    }

    pub fn extent(&self) -> &GeoExtent {
        &self.extent
    }

    /// Ground distance covered by one sample step, in extent units.
    pub fn x_resolution(&self) -> f64 {
        self.extent.width() / (self.grid.columns() - 1).max(1) as f64
    }

    /// Sample the elevation at (x, y) given in `query_srs`.
    ///
    /// Returns `None` when the point lies outside the field or cannot be
    /// transformed; otherwise the sampled height (possibly [`NO_DATA`])
    /// shifted into `out_srs`'s vertical datum.
    pub fn get_elevation(
        &self,
        query_srs: &Srs,
        x: f64,
        y: f64,
        interpolation: Interpolation,
        out_srs: &Srs,
    ) -> Option<f32> {
        let (gx, gy) = if query_srs.is_horiz_equivalent_to(self.extent.srs()) {
            (x, y)
        } else {
            query_srs.transform_2d(x, y, self.extent.srs())?
        };

        if !self.extent.contains(gx, gy) {
            return None;
        }

        let h = self.sample(gx, gy, interpolation);
        if h == NO_DATA || self.extent.srs().is_vert_equivalent_to(out_srs) {
            return Some(h);
        }

        let (lon, lat) = self.extent.srs().to_geographic(gx, gy);
        Some(VerticalDatum::transform_height(
            self.extent.srs().vertical_datum().map(|v| v.as_ref()),
            out_srs.vertical_datum().map(|v| v.as_ref()),
            lon,
            lat,
            h,
        ))
    }

    fn sample(&self, x: f64, y: f64, interpolation: Interpolation) -> f32 {
        let cols = self.grid.columns();
        let rows = self.grid.rows();

        let fx = ((x - self.extent.xmin()) / self.extent.width()) * (cols - 1) as f64;
        let fy = ((y - self.extent.ymin()) / self.extent.height()) * (rows - 1) as f64;
        let fx = fx.clamp(0.0, (cols - 1) as f64);
        let fy = fy.clamp(0.0, (rows - 1) as f64);

        let c0 = fx.floor() as u32;
        let r0 = fy.floor() as u32;
        let c1 = (c0 + 1).min(cols - 1);
        let r1 = (r0 + 1).min(rows - 1);

        match interpolation {
            Interpolation::Nearest => {
                let c = if fx - (c0 as f64) < 0.5 { c0 } else { c1 };
                let r = if fy - (r0 as f64) < 0.5 { r0 } else { r1 };
                self.grid.get(c, r)
            }
            Interpolation::Bilinear => {
                let sw = self.grid.get(c0, r0);
                let se = self.grid.get(c1, r0);
                let nw = self.grid.get(c0, r1);
                let ne = self.grid.get(c1, r1);
                if sw == NO_DATA || se == NO_DATA || nw == NO_DATA || ne == NO_DATA {
                    return NO_DATA;
                }
                let wx = (fx - c0 as f64) as f32;
                let wy = (fy - r0 as f64) as f32;
                let south = sw * (1.0 - wx) + se * wx;
                let north = nw * (1.0 - wx) + ne * wx;
                south * (1.0 - wy) + north * wy
            }
        }
    }
}

/// Orders fields finest resolution first.
pub fn sort_by_resolution_descending(fields: &mut [GeoHeightField]) {
    fields.sort_by(|a, b| a.x_resolution().total_cmp(&b.x_resolution()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Geoid;

    fn ramp_field() -> GeoHeightField {
        // h(c, r) = c + r over a 5x5 grid spanning (0,0)..(4,4).
        let mut grid = HeightGrid::new(5, 5);
        for r in 0..5 {
            for c in 0..5 {
                grid.set(c, r, (c + r) as f32);
            }
        }
        GeoHeightField::new(
            Arc::new(grid),
            GeoExtent::new(Srs::wgs84(), 0.0, 0.0, 4.0, 4.0),
        )
    }

    #[test]
    fn test_exact_sample_positions() {
        let f = ramp_field();
        let srs = Srs::wgs84();
        for (x, y, expect) in [(0.0, 0.0, 0.0), (4.0, 4.0, 8.0), (2.0, 1.0, 3.0)] {
            let h = f
                .get_elevation(&srs, x, y, Interpolation::Bilinear, &srs)
                .unwrap();
            assert_eq!(h, expect);
        }
    }

    #[test]
    fn test_bilinear_between_samples() {
        let f = ramp_field();
        let srs = Srs::wgs84();
        let h = f
            .get_elevation(&srs, 0.5, 0.5, Interpolation::Bilinear, &srs)
            .unwrap();
        assert!((h - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_outside_extent_returns_none() {
        let f = ramp_field();
        let srs = Srs::wgs84();
        assert!(f
            .get_elevation(&srs, -0.1, 0.0, Interpolation::Bilinear, &srs)
            .is_none());
        assert!(f
            .get_elevation(&srs, 0.0, 4.1, Interpolation::Bilinear, &srs)
            .is_none());
    }

    #[test]
    fn test_bilinear_near_no_data_is_no_data() {
        let mut grid = HeightGrid::filled(3, 3, 50.0);
        grid.set(1, 1, NO_DATA);
        let f = GeoHeightField::new(
            Arc::new(grid),
            GeoExtent::new(Srs::wgs84(), 0.0, 0.0, 2.0, 2.0),
        );
        let srs = Srs::wgs84();

        let h = f
            .get_elevation(&srs, 0.5, 0.5, Interpolation::Bilinear, &srs)
            .unwrap();
        assert_eq!(h, NO_DATA);

        // Nearest still reads the valid corner.
        let h = f
            .get_elevation(&srs, 0.1, 0.1, Interpolation::Nearest, &srs)
            .unwrap();
        assert_eq!(h, 50.0);
    }

    #[test]
    fn test_vertical_datum_applied_on_read() {
        let egm = Arc::new(VerticalDatum::new(
            "egm96",
            Some(Geoid::constant("egm96", 20.0)),
        ));
        let grid = Arc::new(HeightGrid::filled(3, 3, 100.0));
        let f = GeoHeightField::new(
            grid,
            GeoExtent::new(
                Srs::wgs84().with_vertical_datum(egm),
                0.0,
                0.0,
                2.0,
                2.0,
            ),
        );

        // Grid datum is MSL (egm96); requesting HAE adds the geoid
        // undulation.
        let hae = Srs::wgs84();
        let h = f
            .get_elevation(&hae, 1.0, 1.0, Interpolation::Bilinear, &hae)
            .unwrap();
        assert_eq!(h, 120.0);
    }

    #[test]
    fn test_query_in_foreign_srs() {
        let f = ramp_field();
        let merc = Srs::spherical_mercator();
        let geo = Srs::wgs84();
        let (mx, my) = geo.transform_2d(2.0, 2.0, &merc).unwrap();

        let h = f
            .get_elevation(&merc, mx, my, Interpolation::Bilinear, &geo)
            .unwrap();
        assert!((h - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_sort_by_resolution() {
        let coarse = GeoHeightField::new(
            Arc::new(HeightGrid::new(3, 3)),
            GeoExtent::new(Srs::wgs84(), 0.0, 0.0, 4.0, 4.0),
        );
        let fine = GeoHeightField::new(
            Arc::new(HeightGrid::new(9, 9)),
            GeoExtent::new(Srs::wgs84(), 0.0, 0.0, 4.0, 4.0),
        );
        let mut fields = vec![coarse.clone(), fine.clone()];
        sort_by_resolution_descending(&mut fields);
        assert_eq!(fields[0].grid().columns(), 9);
        assert_eq!(fields[1].grid().columns(), 3);
    }
}
