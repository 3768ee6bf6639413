//! Normal-map generation.

use std::f64::consts::PI;

use glam::DVec3;

use crate::geo::GeoExtent;
use crate::heightfield::{HeightGrid, NormalMap};

/// Finite-difference normal at integer sample (s, t).
///
/// Neighbors off the grid edge clamp to the center sample. Geographic
/// extents convert angular spacing to meters at the sample's latitude
/// before differencing, so slopes come out in consistent units.
fn normal_at(extent: &GeoExtent, hf: &HeightGrid, s: u32, t: u32) -> DVec3 {
    let w = hf.columns();
    let h = hf.rows();

    let res_x = extent.width() / (w - 1) as f64;
    let res_y = extent.height() / (h - 1) as f64;
    let mut dx = res_x;
    let mut dy = res_y;

    if extent.srs().is_geographic() {
        let radius = extent.srs().ellipsoid().radius_equator();
        let m_per_deg = (2.0 * PI * radius) / 360.0;
        let lat = extent.ymin() + res_y * t as f64;
        dy *= m_per_deg;
        dx = dx * m_per_deg * lat.to_radians().cos();
    }

    let center = hf.get(s, t) as f64;

    let mut west = DVec3::new(0.0, 0.0, center);
    let mut east = DVec3::new(0.0, 0.0, center);
    let mut south = DVec3::new(0.0, 0.0, center);
    let mut north = DVec3::new(0.0, 0.0, center);

    if s > 0 {
        west = DVec3::new(-dx, 0.0, hf.get(s - 1, t) as f64);
    }
    if s < w - 1 {
        east = DVec3::new(dx, 0.0, hf.get(s + 1, t) as f64);
    }
    if t > 0 {
        south = DVec3::new(0.0, -dy, hf.get(s, t - 1) as f64);
    }
    if t < h - 1 {
        north = DVec3::new(0.0, dy, hf.get(s, t + 1) as f64);
    }

    (east - west).cross(north - south)
}

/// Fill `normal_map` with unit normals for `hf`.
///
/// `delta_lod` holds, per pixel, how many levels below the requested
/// tile the winning sample actually came from. Pixels served from a
/// coarser ancestor carry only every `2^delta`-th column/row of real
/// information; sampling neighbors directly there would produce facets,
/// so the normal is instead interpolated between the corners of the
/// step-aligned box around the pixel.
pub fn build_normal_map(
    extent: &GeoExtent,
    hf: &HeightGrid,
    delta_lod: &[i16],
    normal_map: &mut NormalMap,
) {
    let w = hf.columns();
    let h = hf.rows();
    debug_assert_eq!(delta_lod.len(), w as usize * h as usize);
    debug_assert_eq!((normal_map.columns(), normal_map.rows()), (w, h));

    for t in 0..h {
        for s in 0..w {
            let delta = delta_lod[(t * w + s) as usize].max(0) as u32;
            let step = 1u32 << delta.min(30);

            let normal = if step == 1 {
                // Same LOD, simple query.
                normal_at(extent, hf, s, t)
            } else {
                let s0 = s - (s % step);
                let s1 = if s % step == 0 {
                    s0
                } else {
                    (s0 + step).min(w - 1)
                };
                let t0 = t - (t % step);
                let t1 = if t % step == 0 {
                    t0
                } else {
                    (t0 + step).min(h - 1)
                };

                if s0 == s1 && t0 == t1 {
                    // On-pixel, simple query.
                    normal_at(extent, hf, s0, t0)
                } else if s0 == s1 {
                    // Same column; interpolate along the row.
                    let south = normal_at(extent, hf, s0, t0);
                    let north = normal_at(extent, hf, s0, t1);
                    south * (t1 - t) as f64 + north * (t - t0) as f64
                } else if t0 == t1 {
                    // Same row; interpolate along the column.
                    let west = normal_at(extent, hf, s0, t0);
                    let east = normal_at(extent, hf, s1, t0);
                    west * (s1 - s) as f64 + east * (s - s0) as f64
                } else {
                    let sw = normal_at(extent, hf, s0, t0);
                    let se = normal_at(extent, hf, s1, t0);
                    let nw = normal_at(extent, hf, s0, t1);
                    let ne = normal_at(extent, hf, s1, t1);

                    let south = sw * (s1 - s) as f64 + se * (s - s0) as f64;
                    let north = nw * (s1 - s) as f64 + ne * (s - s0) as f64;
                    south * (t1 - t) as f64 + north * (t - t0) as f64
                }
            };

            let unit = normal.try_normalize().unwrap_or(DVec3::Z);
            normal_map.set(s, t, unit.as_vec3(), 0.0);
        }
    }
}
